//! Transport seam and websocket implementation.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum message/frame size for the websocket.
///
/// Sized so that every outgoing message fits in a single frame: Chrome
/// closes the connection when a message arrives fragmented. Large enough
/// for incoming payloads like full-page screenshots.
const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

// ============================================================================
// Transport
// ============================================================================

/// Byte-level transport under a [`Connection`](super::Connection).
///
/// `receive` distinguishes three outcomes the wait loop treats differently:
/// a text payload, an idle read window ([`Error::SocketTimeout`], retried
/// while the caller's deadline is live), and everything else (fatal).
#[async_trait]
pub trait Transport: Send {
    /// Writes one text message.
    async fn send_text(&mut self, payload: String) -> Result<()>;

    /// Reads the next text message, bounded by the socket-level timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::SocketTimeout`] if nothing arrived within `read_timeout`
    /// - [`Error::ConnectionClosed`] if the remote side closed the socket
    /// - [`Error::WebSocket`] on any other transport failure
    async fn receive(&mut self, read_timeout: Duration) -> Result<String>;

    /// Closes the transport.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Websocket client transport over `tokio-tungstenite`.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketTransport {
    /// Opens a websocket to the given debugger URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let config = WebSocketConfig::default()
            .max_message_size(Some(MAX_FRAME_SIZE))
            .max_frame_size(Some(MAX_FRAME_SIZE));

        let (stream, _response) = connect_async_with_config(url, Some(config), true)
            .await
            .map_err(|e| Error::connection(format!("websocket handshake with {url} failed: {e}")))?;

        debug!(url, "websocket connected");
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send_text(&mut self, payload: String) -> Result<()> {
        self.stream.send(Message::Text(payload.into())).await?;
        Ok(())
    }

    async fn receive(&mut self, read_timeout: Duration) -> Result<String> {
        loop {
            let message = match timeout(read_timeout, self.stream.next()).await {
                Err(_elapsed) => return Err(Error::socket_timeout(read_timeout)),
                Ok(None) => return Err(Error::ConnectionClosed),
                Ok(Some(Err(e))) => return Err(Error::WebSocket(e)),
                Ok(Some(Ok(message))) => message,
            };

            match message {
                Message::Text(text) => return Ok(text.to_string()),
                Message::Close(_) => {
                    debug!("websocket closed by browser");
                    return Err(Error::ConnectionClosed);
                }
                // Ping/Pong are answered by tungstenite below this layer;
                // the protocol never sends Binary.
                _ => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(Error::WebSocket(e)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
