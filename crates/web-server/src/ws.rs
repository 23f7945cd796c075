//! The live push channel.
//!
//! Each connection runs as one task that forwards frames from its hub queue
//! to the socket, and deregisters itself when either side goes away.

use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse, Response},
};
use futures_util::{Sink, SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;

const DASHBOARD_HTML: &str = include_str!("../static/dashboard.html");

/// A peer that has not accepted a frame within this window is disconnected.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// # GET /
/// Upgrades WebSocket requests to the push channel; everything else gets the dashboard.
pub async fn root(
    State(state): State<Arc<AppState>>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    match ws {
        Some(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        None => Html(DASHBOARD_HTML).into_response(),
    }
}

/// # GET /ws
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut subscription, initial) = match state.relay.connect() {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!(error = ?e, "[WS] Failed to register subscriber.");
            return;
        }
    };
    let id = subscription.id();
    tracing::info!(subscriber = %id, "[WS] New client connected.");

    let (mut sender, mut receiver) = socket.split();

    if send_within(&mut sender, Message::Text(initial.to_string()), SEND_TIMEOUT).await {
        loop {
            tokio::select! {
                frame = subscription.recv() => match frame {
                    Some(frame) => {
                        if !send_within(&mut sender, Message::Text(frame.to_string()), SEND_TIMEOUT).await {
                            tracing::warn!(subscriber = %id, "[WS] Peer stopped reading.");
                            break;
                        }
                    }
                    None => {
                        // Dropped by the hub (too slow, or shutting down).
                        send_within(&mut sender, Message::Close(None), SEND_TIMEOUT).await;
                        break;
                    }
                },
                inbound = receiver.next() => match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!(subscriber = %id, error = %e, "[WS] Error.");
                        break;
                    }
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    state.relay.disconnect(id);
    tracing::info!(subscriber = %id, "[WS] Connection closed.");
}

/// Sends one message, giving up when the peer does not accept it in time.
async fn send_within<S>(sink: &mut S, message: Message, limit: Duration) -> bool
where
    S: Sink<Message> + Unpin,
{
    matches!(tokio::time::timeout(limit, sink.send(message)).await, Ok(Ok(())))
}
