//! WebSocket connection handling.
//!
//! # Responsibilities
//! - Enforce the connection limit before upgrading
//! - Resolve the caller's claim from the handshake cookie, once
//! - Decode inbound binary frames and hand `request` events to the dispatcher
//! - Write queued replies back to the socket
//!
//! # Data Flow
//! ```text
//! socket stream → Message::decode → spawn_blocking(Dispatcher::dispatch)
//!                                          │
//!                                          ▼
//! socket sink   ← Message::encode ← outbound queue (Connection::send)
//! ```
//!
//! # Design Decisions
//! - One dispatch pass at a time per connection, awaited before the next
//!   frame is read, so replies follow receipt order
//! - Passes run on the blocking pool since the store and renderer are synchronous
//! - Malformed frames are logged and skipped; the connection stays open

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};

use crate::dispatch::{Message, REQUEST_EVENT};
use crate::http::server::AppState;
use crate::net::{Connection, ConnectionGuard};
use crate::session::{resolve_claim, SessionClaim};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Some(guard) = state.tracker.try_track() else {
        tracing::warn!("Connection limit reached, rejecting WebSocket upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    let claim = resolve_claim(&state.codec, cookie);

    ws.on_upgrade(move |socket| handle_socket(socket, state, claim, guard))
}

async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    claim: SessionClaim,
    _guard: ConnectionGuard,
) {
    let (conn, mut outbound) = Connection::channel(claim);
    let (mut sink, mut stream) = socket.split();

    tracing::info!(
        connection_id = %conn.id(),
        alias = %conn.claim().alias,
        privilege = %conn.claim().privilege,
        "WebSocket connected"
    );

    let writer_id = conn.id();
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let frame = match message.encode() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(connection_id = %writer_id, error = %e, "Failed to encode frame");
                    continue;
                }
            };
            if sink.send(WsMessage::Binary(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let bytes = match frame {
            Ok(WsMessage::Binary(bytes)) => bytes,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(connection_id = %conn.id(), error = %e, "WebSocket read failed");
                break;
            }
        };

        let message = match Message::decode(&bytes) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(connection_id = %conn.id(), error = %e, "Dropping malformed frame");
                continue;
            }
        };

        if message.event != REQUEST_EVENT {
            tracing::debug!(connection_id = %conn.id(), event = %message.event, "Ignoring event");
            continue;
        }

        let dispatcher = state.dispatcher.clone();
        let pass_conn = conn.clone();
        if let Err(e) =
            tokio::task::spawn_blocking(move || dispatcher.dispatch(&pass_conn, &message)).await
        {
            tracing::error!(connection_id = %conn.id(), error = %e, "Dispatch task failed");
        }
    }

    let id = conn.id();
    drop(conn);
    let _ = writer.await;
    tracing::info!(connection_id = %id, "WebSocket disconnected");
}
