/**
 * WebSocket Transport
 *
 * GET /ws upgrades to a WebSocket carrying STOMP text frames. Each
 * connection runs:
 *
 * - the reader loop (this task), feeding text messages to its
 *   `ConnectionSession`
 * - one writer task draining the bounded outbound queue into the socket
 * - one forwarding task per subscription, owned by the session
 *
 * # Close Ordering
 *
 * 1. Session closes: forwarders aborted and awaited, registry entry removed
 * 2. Session dropped, releasing the last outbound sender
 * 3. Writer flushes what is queued, sends a Close frame and exits
 */

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::backend::realtime::session::{ConnectionSession, Flow, RealtimeContext};
use crate::backend::server::state::AppState;
use crate::shared::Frame;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let ctx = Arc::new(RealtimeContext::from_state(&state));
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

/// Drive one upgraded connection until either side closes it
pub async fn handle_socket(socket: WebSocket, ctx: Arc<RealtimeContext>) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(ctx.outbound_capacity);

    let mut session = ConnectionSession::new(ctx, outbound_tx);
    let connection_id = session.id();
    tracing::info!("[Realtime] Connection {} opened", connection_id);

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sink.send(Message::Text(frame.encode().into())).await.is_err() {
                tracing::debug!("[Realtime] Connection {} socket write failed", connection_id);
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(message) = stream.next().await {
        let flow = match message {
            Ok(Message::Text(text)) => session.handle_text(text.as_str()).await,
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => session.handle_text(text).await,
                Err(_) => {
                    tracing::warn!("[Realtime] Connection {} sent non UTF-8 binary data", connection_id);
                    Flow::Continue
                }
            },
            Ok(Message::Close(_)) => Flow::Close,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => Flow::Continue,
            Err(err) => {
                tracing::debug!("[Realtime] Connection {} read error: {}", connection_id, err);
                Flow::Close
            }
        };

        if flow == Flow::Close {
            break;
        }
    }

    session.close().await;
    drop(session);

    if let Err(err) = writer.await {
        tracing::warn!("[Realtime] Connection {} writer task failed: {}", connection_id, err);
    }
    tracing::info!("[Realtime] Connection {} closed", connection_id);
}
