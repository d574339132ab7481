//! Production WebSocket transport.
//!
//! Wraps `tokio-tungstenite` behind the [`Transport`] trait. Fragmented
//! messages are reassembled by tungstenite, so `receive` only ever yields
//! whole text frames.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

use super::Transport;

// ============================================================================
// Types
// ============================================================================

/// The underlying socket stream, TLS or plain.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Transport over a real WebSocket connection.
///
/// Holds no socket until [`connect`](Transport::connect) succeeds; a
/// reconnecting engine reuses the same instance across attempts.
#[derive(Debug, Default)]
pub struct WebSocketTransport {
    /// Active socket, `None` while disconnected.
    stream: Option<WsStream>,
}

impl WebSocketTransport {
    /// Creates a disconnected transport.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self, url: &str) -> Result<()> {
        // Drop any stale socket before dialing again
        self.close().await;

        debug!(url, "Connecting to gateway");
        let (stream, response) = connect_async(url).await?;
        trace!(status = %response.status(), "WebSocket handshake complete");

        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Option<String>> {
        loop {
            let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),

                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by remote");
                    self.stream = None;
                    return Ok(None);
                }

                // Ping/pong handled by tungstenite; binary frames are not
                // part of the JSON encoding
                Some(Ok(other)) => {
                    trace!(kind = ?other, "Ignoring non-text frame");
                }

                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket receive error");
                    self.stream = None;
                    return Err(e.into());
                }

                None => {
                    debug!("WebSocket stream ended");
                    self.stream = None;
                    return Ok(None);
                }
            }
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take()
            && let Err(e) = stream.close(None).await
        {
            trace!(error = %e, "Close handshake failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_while_disconnected() {
        let mut transport = WebSocketTransport::new();
        let err = transport.send("{}".to_string()).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_receive_while_disconnected() {
        let mut transport = WebSocketTransport::new();
        let err = transport.receive().await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut transport = WebSocketTransport::new();
        transport.close().await;
        transport.close().await;
        assert!(!transport.is_open());
    }
}
