//! WebSocket endpoint driving one conversation session per connection.
//!
//! The `/api/v1/session` endpoint upgrades to a WebSocket and bridges it to a
//! [`ChannelTunnel`]:
//!
//! - **Reader task:** forwards text frames to the tunnel as raw JSON; the
//!   session parses them and reports malformed ones back to the client.
//! - **Writer task:** serializes every [`ServerMessage`] the session sends as
//!   a JSON text frame.
//!
//! The session itself runs on the connection task. Closing the socket, or
//! server shutdown, cancels the session's in-flight work.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use parley_core::session::runner::run_session;
use parley_core::tunnel::{ChannelTunnel, TunnelEndpoint};
use parley_types::protocol::ServerMessage;

use crate::state::AppState;

/// Inbound frames buffered before the reader waits on the session.
const FRAME_BUFFER: usize = 32;

/// How long the writer may keep flushing after the session ended.
const WRITER_GRACE: Duration = Duration::from_secs(5);

/// Upgrade an HTTP request to a session WebSocket.
pub async fn session_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_session_socket(socket, state))
}

async fn handle_session_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tunnel, endpoint) = ChannelTunnel::pair(FRAME_BUFFER);
    let TunnelEndpoint {
        frames,
        mut messages,
    } = endpoint;
    let connection = state.shutdown.child_token();

    let reader_cancel = connection.clone();
    let reader = tokio::spawn(async move {
        loop {
            let msg_result = tokio::select! {
                _ = reader_cancel.cancelled() => break,
                msg_result = ws_receiver.next() => msg_result,
            };
            match msg_result {
                Some(Ok(Message::Text(text))) => {
                    if frames.send(text.as_str().to_owned()).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(err)) => {
                    tracing::debug!("WebSocket receive error: {err}");
                    break;
                }
                // Ignore binary, ping, pong protocol frames (handled by axum/tungstenite)
                Some(Ok(_)) => {}
            }
        }
        // Dropping `frames` closes the tunnel, which ends the session.
    });

    let writer = tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            if !forward(&mut ws_sender, &message).await {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    if let Err(err) = run_session(
        Arc::new(tunnel),
        state.session_dependencies(),
        connection.clone(),
    )
    .await
    {
        tracing::warn!(error = %err, "session ended with an error");
    }

    connection.cancel();
    let _ = reader.await;
    if tokio::time::timeout(WRITER_GRACE, writer).await.is_err() {
        tracing::debug!("WebSocket writer did not finish in time");
    }
    tracing::debug!("WebSocket connection closed");
}

/// Send one message as a JSON text frame. Returns false once the client is gone.
async fn forward(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    message: &ServerMessage,
) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => ws_sender.send(Message::Text(json.into())).await.is_ok(),
        Err(err) => {
            tracing::warn!("Failed to serialize ServerMessage: {err}");
            true
        }
    }
}
