//! Socket transport layer.
//!
//! One [`Connection`] exclusively owns one websocket to one debugging
//! target, the monotonically increasing command-id counter, and the
//! socket-level read timeout. Connections are never shared between two
//! concurrent command issuers; the wait loop in [`crate::client`] is the
//! only reader.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | [`Transport`] seam and the websocket implementation |
//! | `connection` | Connection ownership, id allocation, frame logging |

// ============================================================================
// Submodules
// ============================================================================

/// Connection ownership and frame I/O.
pub mod connection;

/// Transport seam and websocket implementation.
pub mod socket;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, DEFAULT_READ_TIMEOUT};
pub use socket::{Transport, WebSocketTransport};
