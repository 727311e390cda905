//! # JSON File Backend
//!
//! One JSON file per storage key inside a data directory.
//!
//! ## File Format
//! ```json
//! {
//!   "version": 1,
//!   "key": "shopping_list_manager.products",
//!   "data": { "milk": { "key": "milk", "name": "Milk", ... } }
//! }
//! ```
//!
//! ## Atomic Writes
//! ```text
//! save("shopping_list_manager.active")
//!      │
//!      ├── write  <dir>/shopping_list_manager.active.tmp
//!      ├── flush + fsync
//!      └── rename → <dir>/shopping_list_manager.active
//! ```
//! A crash leaves either the old file or the new one, never half of each.
//! A failed write removes its `.tmp` file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{into_document, Document, DocumentBackend, StoredDocument};
use crate::error::{StoreError, StoreResult};

/// On-disk envelope, written form.
#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    key: &'a str,
    data: &'a Document,
}

/// On-disk envelope, read form.
#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: Value,
}

/// File-per-key document backend.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    /// Creates a backend rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileBackend { dir: dir.into() }
    }

    /// Returns the data directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path for `key`, rejecting keys that would escape the directory.
    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('.')
            || key.contains(['/', '\\'])
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl DocumentBackend for JsonFileBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn load(&self, key: &str) -> StoreResult<Option<StoredDocument>> {
        let path = self.path_for(key)?;

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = serde_json::from_str(&contents)?;
        Ok(Some(StoredDocument {
            version: envelope.version,
            data: into_document(key, envelope.data)?,
        }))
    }

    async fn save(&self, key: &str, version: u32, data: &Document) -> StoreResult<()> {
        let path = self.path_for(key)?;
        let tmp_path = self.dir.join(format!("{key}.tmp"));

        let contents = serde_json::to_vec_pretty(&EnvelopeRef { version, key, data })?;

        fs::create_dir_all(&self.dir).await?;

        let written: std::io::Result<()> = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(&contents).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp_path, &path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = contents.len(), "Wrote document file");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        fs::create_dir_all(&self.dir).await.is_ok()
    }
}
