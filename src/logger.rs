//! Structured wire logging.
//!
//! Every command sent, every frame received, every connection-level error
//! and every readiness transition is reported here as a structured
//! `tracing` event (target `devtools_wire`), tagged with the connection's
//! label and a process-wide monotonically increasing sequence number.
//!
//! The logger is an explicit capability: constructed once at process start
//! and passed by [`Arc`] into every connection and state machine. It is
//! purely observational and never influences control flow.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::error::Error;
use crate::protocol::Frame;

// ============================================================================
// Constants
// ============================================================================

/// Tracing target for wire-level records, filterable independently of the
/// rest of the crate.
const WIRE: &str = "devtools_wire";

// ============================================================================
// DebugLogger
// ============================================================================

/// Wire-level debug logger shared by all connections of one driver.
#[derive(Debug, Default)]
pub struct DebugLogger {
    sequence: AtomicU64,
}

impl DebugLogger {
    /// Creates a fresh logger with its sequence at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn next_seq(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records an outgoing command (already encoded).
    pub fn command_sent(&self, client: &str, payload: &str) {
        debug!(target: WIRE, seq = self.next_seq(), client, action = "send", payload);
    }

    /// Records a received frame and the reason the wait loop was reading.
    pub fn frame_received(&self, client: &str, waiting: &str, frame: &Frame) {
        debug!(
            target: WIRE,
            seq = self.next_seq(),
            client,
            action = "receive",
            waiting,
            frame = ?frame,
        );
    }

    /// Records a connection-level failure observed while reading.
    pub fn connection_error(&self, client: &str, waiting: &str, error: &Error) {
        debug!(
            target: WIRE,
            seq = self.next_seq(),
            client,
            action = "connectionError",
            waiting,
            error = %error,
        );
    }

    /// Records a readiness transition of a page state machine.
    pub fn ready_state_change(&self, client: &str, ready: bool, trigger: &str) {
        debug!(
            target: WIRE,
            seq = self.next_seq(),
            client,
            action = "readyStateChange",
            ready,
            trigger,
        );
    }

    /// Records a socket being reopened without an intervening close.
    ///
    /// This is never a normal code path; it indicates an unexpected
    /// reconnection worth investigating.
    pub fn connection_reopened(&self, client: &str, count: u32) {
        warn!(
            target: WIRE,
            seq = self.next_seq(),
            client,
            action = "reconnect",
            count,
            "browser socket connection reopened"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
