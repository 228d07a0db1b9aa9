//! WebSocket upgrade handler and per-connection session plumbing
//!
//! Each socket gets a bounded outbound queue; the world task fans
//! snapshots into it with try_send so a stalled client can never block the
//! tick loop. Credentials are exchanged in-band via the handshake message,
//! so the upgrade itself is unauthenticated.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ConnectionId, WorldCommand};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound queue depth per connection. Roughly one second of snapshots;
/// overflow skips frames rather than disconnecting.
const SEND_QUEUE_DEPTH: usize = 64;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id: ConnectionId = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMsg>(SEND_QUEUE_DEPTH);

    if !state.world.send(WorldCommand::Connected { conn_id, tx }).await {
        warn!(conn_id = %conn_id, "World task unavailable, dropping connection");
        return;
    }

    // Writer task: world queue -> socket
    let writer_conn_id = conn_id;
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!(conn_id = %writer_conn_id, error = %e, "Failed to serialize message");
                    continue;
                }
            };
            if let Err(e) = ws_sink.send(Message::Text(json)).await {
                debug!(conn_id = %writer_conn_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: socket -> world task
    let rate_limiter = ConnectionRateLimiter::new();
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(conn_id = %conn_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if !state.world.send(WorldCommand::Message { conn_id, msg }).await {
                            debug!(conn_id = %conn_id, "World task gone, closing");
                            break;
                        }
                    }
                    // Malformed frames are dropped, never fatal
                    Err(e) => {
                        debug!(conn_id = %conn_id, error = %e, "Unparseable client message ignored");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(conn_id = %conn_id, "Binary message ignored");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!(conn_id = %conn_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    let _ = state.world.send(WorldCommand::Disconnected { conn_id }).await;
    writer.abort();

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
