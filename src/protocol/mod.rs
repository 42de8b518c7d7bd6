//! Wire protocol message types.
//!
//! The DevTools protocol is JSON text frames over a persistent websocket.
//!
//! | Message | Direction | Shape |
//! |---------|-----------|-------|
//! | [`Command`] | local → browser | `{"id", "method", "params"?}` |
//! | [`Reply`] | browser → local | `{"id", "result"?}` or `{"id", "error"}` |
//! | [`Event`] | browser → local | `{"method", "params"}`, no `id` |
//!
//! An incoming frame is classified by the presence of `id`: with one it is
//! a [`Reply`] answering a previously sent [`Command`], without one it is
//! an unsolicited [`Event`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outgoing command envelope |
//! | `frame` | Incoming frame decoding |

// ============================================================================
// Submodules
// ============================================================================

/// Outgoing command envelope.
pub mod command;

/// Incoming frame decoding.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::Command;
pub use frame::{Event, Frame, RemoteError, Reply};
