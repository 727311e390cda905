//! # shoplist-server
//!
//! ```text
//! SHOPLIST_CONFIG=/etc/shoplist/config.toml RUST_LOG=debug shoplist-server
//! ```

use std::process::ExitCode;

use shoplist_server::config::ServerConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ServerConfig::load(None) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("shoplist-server: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.logging.filter);

    info!(
        addr = %config.server.bind_address(),
        backend = %config.storage.backend,
        path = ?config.storage.path,
        "Starting shopping list server"
    );

    match shoplist_server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server exited with error");
            ExitCode::FAILURE
        }
    }
}

/// Installs the fmt subscriber. `RUST_LOG` wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
