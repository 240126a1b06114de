//! Bidirectional message channel between a session and its client.
//!
//! The session only ever sees typed messages. [`ChannelTunnel`] is the
//! in-process implementation: inbound frames arrive as raw JSON text and are
//! parsed on receive, outbound messages are pushed to an unbounded channel
//! drained by the transport (the WebSocket writer in parley-api).

use parley_types::error::TunnelError;
use parley_types::protocol::{ClientMessage, ServerMessage};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Typed client transport.
pub trait Tunnel: Send + Sync + 'static {
    /// Deliver a message to the client.
    ///
    /// Takes no cancellation token: sends only enqueue, and error notices
    /// from a cancelled operation must still reach the client.
    fn send(
        &self,
        message: ServerMessage,
    ) -> impl std::future::Future<Output = Result<(), TunnelError>> + Send;

    /// Wait for the next client message.
    ///
    /// Returns `Ok(None)` when the client went away or `cancel` fired, and
    /// `Err(TunnelError::Serialization)` for a frame that is not a valid
    /// [`ClientMessage`] (the tunnel stays usable).
    fn receive(
        &self,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<Option<ClientMessage>, TunnelError>> + Send;
}

/// Tunnel backed by tokio channels.
pub struct ChannelTunnel {
    outbound: mpsc::UnboundedSender<ServerMessage>,
    inbound: Mutex<mpsc::Receiver<String>>,
}

/// The transport's side of a [`ChannelTunnel`].
pub struct TunnelEndpoint {
    /// Raw inbound frames (JSON text) for the session.
    pub frames: mpsc::Sender<String>,
    /// Messages the session sent.
    pub messages: mpsc::UnboundedReceiver<ServerMessage>,
}

impl ChannelTunnel {
    /// Create a tunnel and the endpoint a transport drives it through.
    ///
    /// `capacity` bounds buffered inbound frames, applying backpressure to
    /// the reader when the session falls behind.
    pub fn pair(capacity: usize) -> (Self, TunnelEndpoint) {
        let (frames_tx, frames_rx) = mpsc::channel(capacity);
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: messages_tx,
                inbound: Mutex::new(frames_rx),
            },
            TunnelEndpoint {
                frames: frames_tx,
                messages: messages_rx,
            },
        )
    }
}

impl Tunnel for ChannelTunnel {
    async fn send(&self, message: ServerMessage) -> Result<(), TunnelError> {
        self.outbound.send(message).map_err(|_| TunnelError::Closed)
    }

    async fn receive(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<ClientMessage>, TunnelError> {
        let mut inbound = self.inbound.lock().await;
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            frame = inbound.recv() => frame,
        };

        match frame {
            None => Ok(None),
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| TunnelError::Serialization(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_parses_frames() {
        let (tunnel, endpoint) = ChannelTunnel::pair(4);
        endpoint
            .frames
            .send(r#"{"type":"send","text":"Hello"}"#.to_string())
            .await
            .unwrap();

        let msg = tunnel.receive(&CancellationToken::new()).await.unwrap();
        assert_eq!(
            msg,
            Some(ClientMessage::Send {
                text: "Hello".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_frame_is_serialization_error() {
        let (tunnel, endpoint) = ChannelTunnel::pair(4);
        endpoint.frames.send("not json".to_string()).await.unwrap();
        endpoint
            .frames
            .send(r#"{"type":"stop_listening"}"#.to_string())
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let err = tunnel.receive(&cancel).await.unwrap_err();
        assert!(matches!(err, TunnelError::Serialization(_)));
        // The tunnel keeps working after a bad frame.
        let msg = tunnel.receive(&cancel).await.unwrap();
        assert_eq!(msg, Some(ClientMessage::StopListening));
    }

    #[tokio::test]
    async fn test_receive_returns_none_when_cancelled_or_closed() {
        let (tunnel, endpoint) = ChannelTunnel::pair(4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(tunnel.receive(&cancel).await.unwrap(), None);

        drop(endpoint);
        assert_eq!(
            tunnel.receive(&CancellationToken::new()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_send_after_endpoint_dropped_is_closed() {
        let (tunnel, endpoint) = ChannelTunnel::pair(1);
        drop(endpoint);
        let err = tunnel.send(ServerMessage::RecognitionStarted).await.unwrap_err();
        assert!(matches!(err, TunnelError::Closed));
    }
}
