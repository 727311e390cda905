//! # WebSocket Server
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Server Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      axum Router                                │   │
//! │  │                                                                 │   │
//! │  │  /health ──▶ 200 "OK" / 503 when storage is unusable            │   │
//! │  │  /ws     ──▶ WebSocket upgrade                                  │   │
//! │  │                   │                                             │   │
//! │  │                   ▼                                             │   │
//! │  │         ┌───────────────────┐                                   │   │
//! │  │         │ Connection task   │ one per client                    │   │
//! │  │         └─────────┬─────────┘                                   │   │
//! │  │                   │                                             │   │
//! │  │     ┌─────────────┼──────────────┬──────────────┐               │   │
//! │  │     ▼             ▼              ▼              ▼               │   │
//! │  │  receive loop  outgoing task  ping task   event forwarders      │   │
//! │  │  (commands)    (mpsc → sink)  (30s)       (one per subscribe)   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Commands on one connection run one at a time, in arrival order.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use shoplist_manager::{ListEvent, ShoppingListManager};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Duration};
use tracing::{debug, info, warn};

use crate::commands;
use crate::config::ServerSettings;
use crate::error::{ServerError, ServerResult};
use crate::protocol::OutgoingMessage;

// =============================================================================
// Constants
// =============================================================================

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum message size (1MB).
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Outgoing queue depth per connection.
const OUTGOING_BUFFER: usize = 64;

/// How long a closing connection may spend flushing queued replies.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Router
// =============================================================================

/// Builds the router around a shared manager.
pub fn router(manager: Arc<ShoppingListManager>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(manager)
}

/// Binds the listener described by `settings`.
pub async fn bind(settings: &ServerSettings) -> ServerResult<TcpListener> {
    let addr = settings.bind_address();
    TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    manager: Arc<ShoppingListManager>,
    shutdown: F,
) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "WebSocket server listening");
    }

    axum::serve(
        listener,
        router(manager).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    info!("WebSocket server stopped");
    Ok(())
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint. Reports 503 when the storage backend is unusable.
async fn health_handler(State(manager): State<Arc<ShoppingListManager>>) -> impl IntoResponse {
    if manager.storage_healthy().await {
        (StatusCode::OK, "OK")
    } else {
        warn!("Health check failed: storage unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(manager): State<Arc<ShoppingListManager>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    info!(addr = %addr, "New WebSocket connection");
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, manager, addr))
}

/// Handles a WebSocket connection.
async fn handle_socket(socket: WebSocket, manager: Arc<ShoppingListManager>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(OUTGOING_BUFFER);

    // Outgoing message task
    let outgoing_handle = tokio::spawn(async move {
        while let Some(msg) = outgoing_rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Ping task
    let outgoing_tx_ping = outgoing_tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_interval = interval(PING_INTERVAL);
        ping_interval.tick().await;
        loop {
            ping_interval.tick().await;
            if outgoing_tx_ping
                .send(Message::Ping(axum::body::Bytes::new()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let mut forwarders: Vec<JoinHandle<()>> = Vec::new();

    // Main receive loop
    loop {
        let text = match receiver.next().await {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(data))) => String::from_utf8_lossy(&data).into_owned(),
            Some(Ok(Message::Ping(data))) => {
                let _ = outgoing_tx.send(Message::Pong(data)).await;
                continue;
            }
            Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) => {
                info!(addr = %addr, "Client requested close");
                break;
            }
            Some(Err(e)) => {
                warn!(addr = %addr, ?e, "WebSocket error");
                break;
            }
            None => {
                info!(addr = %addr, "Client disconnected");
                break;
            }
        };

        let handled = commands::handle_message(&manager, &text).await;

        // Subscribe before the reply goes out so no later change is missed.
        if let Some(id) = handled.subscription {
            let events = manager.events().subscribe();
            forwarders.push(spawn_forwarder(id, events, outgoing_tx.clone(), addr));
            debug!(addr = %addr, id, "Subscribed to list updates");
        }

        if !queue(&outgoing_tx, &handled.reply).await {
            break;
        }
    }

    // Cleanup: stop producers, then let queued replies drain.
    for forwarder in forwarders {
        forwarder.abort();
    }
    ping_handle.abort();
    drain_outgoing(outgoing_tx, outgoing_handle, addr).await;
}

/// Closes the queue and waits up to [`FLUSH_TIMEOUT`] for the writer to finish.
async fn drain_outgoing<T>(outgoing_tx: mpsc::Sender<T>, writer: JoinHandle<()>, addr: SocketAddr) {
    drop(outgoing_tx);

    let abort = writer.abort_handle();
    if timeout(FLUSH_TIMEOUT, writer).await.is_err() {
        debug!(addr = %addr, "Outgoing queue did not drain in time");
        abort.abort();
    }
}

/// Forwards manager events to one subscription.
fn spawn_forwarder(
    id: u64,
    mut events: broadcast::Receiver<ListEvent>,
    outgoing_tx: mpsc::Sender<Message>,
    addr: SocketAddr,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                // Missed events collapse into one refresh.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(addr = %addr, skipped, "Event subscriber lagged");
                    ListEvent::Updated
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            if !queue(&outgoing_tx, &OutgoingMessage::event(id, event)).await {
                break;
            }
        }
    })
}

/// Serializes and queues a message. Returns false once the connection is gone.
async fn queue(outgoing_tx: &mpsc::Sender<Message>, msg: &OutgoingMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => outgoing_tx.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(?e, "Failed to serialize outgoing message");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use shoplist_manager::EventBus;
    use shoplist_store::MemoryBackend;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn start() -> (SocketAddr, Arc<ShoppingListManager>, oneshot::Sender<()>) {
        let manager = Arc::new(ShoppingListManager::new(
            Arc::new(MemoryBackend::new()),
            EventBus::default(),
        ));
        manager.load().await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let served = manager.clone();
        tokio::spawn(async move {
            serve(listener, served, async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
        });

        (addr, manager, shutdown_tx)
    }

    async fn request(client: &mut Client, request: Value) -> Value {
        client
            .send(WsMessage::Text(request.to_string().into()))
            .await
            .unwrap();
        next_json(client).await
    }

    async fn next_json(client: &mut Client) -> Value {
        loop {
            match client.next().await.unwrap().unwrap() {
                WsMessage::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    #[test]
    fn test_bind_address_format() {
        let settings = ServerSettings {
            bind_addr: "127.0.0.1".into(),
            port: 9000,
        };
        assert_eq!(settings.bind_address(), "127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_websocket_round_trip_with_subscription() {
        let (addr, manager, shutdown) = start().await;
        let (mut client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

        let reply = request(
            &mut client,
            json!({ "id": 1, "type": "shopping_list_manager/subscribe" }),
        )
        .await;
        assert_eq!(reply, json!({ "id": 1, "type": "result", "success": true, "result": { "success": true } }));

        let reply = request(
            &mut client,
            json!({ "id": 2, "type": "shopping_list_manager/add_product", "key": "milk", "name": "Milk" }),
        )
        .await;

        // The event and the result may arrive in either order.
        let other = next_json(&mut client).await;
        let (result, event) = if reply["type"] == "result" { (reply, other) } else { (other, reply) };
        assert_eq!(result["id"], 2);
        assert_eq!(result["result"]["name"], "Milk");
        assert_eq!(
            event,
            json!({ "id": 1, "type": "event", "event": { "event_type": "shopping_list_manager_updated" } })
        );

        assert_eq!(manager.get_product("milk").map(|p| p.name), Some("Milk".to_string()));

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_websocket_reports_bad_requests() {
        let (addr, _, shutdown) = start().await;
        let (mut client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

        let reply = request(&mut client, json!({ "id": 5, "type": "shopping_list_manager/nope" })).await;
        assert_eq!(reply["success"], false);
        assert_eq!(reply["error"]["code"], "unknown_command");

        let reply = request(
            &mut client,
            json!({ "id": 6, "type": "shopping_list_manager/set_qty", "key": "ghost", "qty": 1 }),
        )
        .await;
        assert_eq!(reply["error"]["code"], "invariant_violation");

        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn test_health_reports_storage_state() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = Arc::new(ShoppingListManager::new(backend.clone(), EventBus::default()));

        let response = health_handler(State(manager.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        backend.set_read_only(true);
        let response = health_handler(State(manager)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_drain_delivers_queued_messages() {
        let (tx, mut rx) = mpsc::channel::<u32>(OUTGOING_BUFFER);
        let delivered = Arc::new(std::sync::Mutex::new(Vec::new()));

        let sink = delivered.clone();
        let writer = tokio::spawn(async move {
            while let Some(n) = rx.recv().await {
                tokio::time::sleep(Duration::from_millis(5)).await;
                sink.lock().unwrap().push(n);
            }
        });

        for n in 0..3 {
            tx.send(n).await.unwrap();
        }
        drain_outgoing(tx, writer, "127.0.0.1:0".parse().unwrap()).await;

        assert_eq!(*delivered.lock().unwrap(), vec![0, 1, 2]);
    }
}
