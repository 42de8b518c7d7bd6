//! Connection ownership, id allocation, frame logging.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::logger::DebugLogger;
use crate::protocol::{Command, Frame};
use crate::transport::socket::{Transport, WebSocketTransport};

// ============================================================================
// Constants
// ============================================================================

/// Default socket-level read timeout.
///
/// Bounds a single blocking read, not an operation: the wait loop retries
/// idle reads for as long as its own deadline is live.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Connection
// ============================================================================

/// One exclusively owned socket to one debugging target.
///
/// Owns the command-id counter (monotonic from 1, never reused) and the
/// socket-level read timeout. Created unconnected; [`connect`] opens the
/// socket, [`close`] releases it. Exactly one logical actor drives a
/// connection — it is never shared between concurrent command issuers.
///
/// [`connect`]: Connection::connect
/// [`close`]: Connection::close
pub struct Connection {
    label: String,
    transport: Option<Box<dyn Transport>>,
    next_id: CommandId,
    read_timeout: Duration,
    connect_count: u32,
    logger: Arc<DebugLogger>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("label", &self.label)
            .field("connected", &self.transport.is_some())
            .field("next_id", &self.next_id)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates an unconnected connection.
    ///
    /// The label identifies this connection in wire logs (e.g. `browser`
    /// or `page:<target id>`).
    #[must_use]
    pub fn new(label: impl Into<String>, read_timeout: Duration, logger: Arc<DebugLogger>) -> Self {
        Self {
            label: label.into(),
            transport: None,
            next_id: CommandId::FIRST,
            read_timeout,
            connect_count: 0,
            logger,
        }
    }

    /// Opens the socket to the given debugger URL.
    ///
    /// Connecting twice without an intervening [`close`](Connection::close)
    /// reopens the socket and is recorded as anomalous — it is never a
    /// normal code path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the websocket handshake fails.
    pub async fn connect(&mut self, url: &str) -> Result<()> {
        let transport = WebSocketTransport::connect(url).await?;
        self.install_transport(Box::new(transport));
        Ok(())
    }

    /// Adopts an opened transport, counting the connection and flagging
    /// a reopen without close. The command-id counter is untouched: ids
    /// stay unique across the connection's whole lifetime.
    fn install_transport(&mut self, transport: Box<dyn Transport>) {
        self.connect_count += 1;
        if self.connect_count > 1 {
            self.logger
                .connection_reopened(&self.label, self.connect_count);
        }
        self.transport = Some(transport);
    }

    /// Closes the socket, if open.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    /// Returns `true` while the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Returns this connection's log label.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Allocates the next command id, encodes and writes the command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] when unconnected, or the
    /// transport's write failure.
    pub async fn write_command(&mut self, method: &str, params: Value) -> Result<CommandId> {
        let command = Command::new(self.next_id, method, params);
        self.next_id = self.next_id.next();

        let payload = command.encode()?;
        self.logger.command_sent(&self.label, &payload);

        let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;
        transport.send_text(payload).await?;
        Ok(command.id)
    }

    /// Reads and decodes the next frame.
    ///
    /// `reason` names what the caller is waiting for; it appears in wire
    /// logs only.
    ///
    /// # Errors
    ///
    /// - [`Error::SocketTimeout`] when the read window elapsed idle
    /// - [`Error::ConnectionClosed`] / [`Error::WebSocket`] on transport failure
    /// - [`Error::Protocol`] for payloads that decode to nothing legitimate
    pub async fn receive_frame(&mut self, reason: &str) -> Result<Frame> {
        let read_timeout = self.read_timeout;
        let transport = self.transport.as_mut().ok_or(Error::ConnectionClosed)?;

        let text = match transport.receive(read_timeout).await {
            Ok(text) => text,
            Err(e) => {
                self.logger.connection_error(&self.label, reason, &e);
                return Err(e);
            }
        };

        match Frame::decode(&text) {
            Ok(frame) => {
                self.logger.frame_received(&self.label, reason, &frame);
                Ok(frame)
            }
            Err(e) => {
                self.logger.connection_error(&self.label, reason, &e);
                Err(e)
            }
        }
    }
}

// ============================================================================
// Test Support
// ============================================================================

#[cfg(test)]
impl Connection {
    /// Creates a connection already wired to a scripted transport.
    pub(crate) fn with_transport(
        label: impl Into<String>,
        transport: Box<dyn Transport>,
        logger: Arc<DebugLogger>,
    ) -> Self {
        Self {
            label: label.into(),
            transport: Some(transport),
            next_id: CommandId::FIRST,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_count: 1,
            logger,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
