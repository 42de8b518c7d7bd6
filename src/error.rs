//! Error types for the Chrome DevTools driver.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`].
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::SocketTimeout`] |
//! | Timeouts | [`Error::Timeout`], [`Error::PageNotLoaded`] |
//! | Protocol | [`Error::Protocol`], [`Error::CommandFailed`] |
//! | Lifecycle | [`Error::TargetCrashed`], [`Error::CrashRecoveryFailed`], [`Error::UnexpectedDialog`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |
//!
//! The split between [`Error::SocketTimeout`] and [`Error::Timeout`] is
//! load-bearing: an idle socket read is retried by the wait loop for as long
//! as the caller's deadline is live, while deadline exhaustion is a hard
//! stop that is never retried.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::protocol::RemoteError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration or connectivity problem outside the protocol itself.
    ///
    /// Returned when the HTTP bootstrap probe cannot be parsed; the message
    /// carries the probed address and the raw response body.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The transport could not be opened, or failed for a reason other
    /// than a read timeout. Fatal, never retried.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The websocket was closed, or was never connected.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No data arrived within the socket-level read window.
    ///
    /// The browser going quiet for a read window is normal (idle page,
    /// slow main-document response); the wait loop swallows this variant
    /// and retries the read while the caller's deadline is still live.
    #[error("Socket read timed out after {timeout_ms}ms")]
    SocketTimeout {
        /// Milliseconds waited on the socket.
        timeout_ms: u64,
    },

    // ========================================================================
    // Timeout Errors
    // ========================================================================
    /// No satisfying frame arrived before the effective deadline.
    ///
    /// The socket itself is healthy; the browser has simply never reached
    /// the awaited state.
    #[error("Timed out after {waited_ms}ms waiting for {operation} (websocket healthy)")]
    Timeout {
        /// What the wait loop was waiting for.
        operation: String,
        /// Milliseconds waited before giving up.
        waited_ms: u64,
    },

    /// A navigation did not reach the loaded state in time.
    #[error("Page not loaded: {source}")]
    PageNotLoaded {
        /// The underlying wait failure.
        #[source]
        source: Box<Error>,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed or empty payload where one is never legitimate.
    ///
    /// Treated as an unrecoverable desynchronization rather than swallowed.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The browser replied to a command with an explicit error object.
    ///
    /// Code and message are passed through verbatim from the remote error.
    #[error("Browser returned error {code}: {message}")]
    CommandFailed {
        /// Remote error code.
        code: i64,
        /// Remote error message (with its `data` detail appended, if any).
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The render target crashed; it was recovered for subsequent use, but
    /// the operation that was in flight cannot be assumed to have completed.
    #[error("Browser target crashed; recovered, but the interrupted operation did not complete")]
    TargetCrashed,

    /// The render target crashed and automatic recovery failed.
    #[error("Browser target crashed and could not be recovered: {source}")]
    CrashRecoveryFailed {
        /// Why recovery failed.
        #[source]
        source: Box<Error>,
    },

    /// A javascript dialog opened and local handling failed.
    ///
    /// The dialog itself is always resolved at the protocol level before
    /// this error is raised; the browser is never left blocked.
    #[error("Unexpected javascript {dialog_type} dialog ({message:?}): {reason}")]
    UnexpectedDialog {
        /// Dialog kind as declared by the browser (alert, confirm, prompt, beforeunload).
        dialog_type: String,
        /// The dialog's message text.
        message: String,
        /// Why handling failed (missing handler, handler error).
        reason: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP bootstrap error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an idle socket read timeout.
    #[inline]
    pub fn socket_timeout(window: Duration) -> Self {
        Self::SocketTimeout {
            timeout_ms: window.as_millis() as u64,
        }
    }

    /// Creates a deadline-exhaustion timeout.
    #[inline]
    pub fn timeout(operation: impl Into<String>, waited: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            waited_ms: waited.as_millis() as u64,
        }
    }

    /// Wraps a wait failure as a page-load failure.
    #[inline]
    pub fn page_not_loaded(source: Error) -> Self {
        Self::PageNotLoaded {
            source: Box::new(source),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a command failure from a remote error object.
    #[inline]
    pub fn command_failed(remote: &RemoteError) -> Self {
        Self::CommandFailed {
            code: remote.code,
            message: remote.full_message(),
        }
    }

    /// Creates a crash-recovery failure.
    #[inline]
    pub fn crash_recovery_failed(source: Error) -> Self {
        Self::CrashRecoveryFailed {
            source: Box::new(source),
        }
    }

    /// Creates a dialog-handling failure.
    #[inline]
    pub fn unexpected_dialog(
        dialog_type: impl Into<String>,
        message: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnexpectedDialog {
            dialog_type: dialog_type.into(),
            message: message.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout of either flavor.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::SocketTimeout { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if the connection itself is broken.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the render target crashed.
    #[inline]
    #[must_use]
    pub fn is_crash(&self) -> bool {
        matches!(
            self,
            Self::TargetCrashed | Self::CrashRecoveryFailed { .. }
        )
    }

    /// Returns `true` if the browser reported the requested capability as
    /// unsupported (older builds without browser-context commands).
    #[inline]
    #[must_use]
    pub fn is_capability_unsupported(&self) -> bool {
        matches!(
            self,
            Self::CommandFailed { code, .. } if RemoteError::is_unsupported_code(*code)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
