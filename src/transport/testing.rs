//! Scripted transport for state-machine tests.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::transport::socket::Transport;

// ============================================================================
// FakeTransport
// ============================================================================

/// One scripted read outcome.
pub(crate) enum ScriptedRead {
    /// A text payload.
    Frame(String),
    /// An idle socket-read timeout.
    Idle,
}

/// Transport that replays a scripted sequence of reads and records every
/// write as decoded JSON.
///
/// When the script runs out, `receive` reports the connection as closed —
/// unless `idle_when_empty` is set, in which case it reports an idle read
/// timeout forever (for deadline tests).
pub(crate) struct FakeTransport {
    incoming: VecDeque<ScriptedRead>,
    sent: Arc<Mutex<Vec<Value>>>,
    idle_when_empty: bool,
}

impl FakeTransport {
    /// Creates an empty-scripted transport and a handle to its send log.
    pub(crate) fn new() -> (Self, Arc<Mutex<Vec<Value>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = Self {
            incoming: VecDeque::new(),
            sent: Arc::clone(&sent),
            idle_when_empty: false,
        };
        (transport, sent)
    }

    /// Creates a transport whose reads always time out idle.
    pub(crate) fn idle() -> (Self, Arc<Mutex<Vec<Value>>>) {
        let (mut transport, sent) = Self::new();
        transport.idle_when_empty = true;
        (transport, sent)
    }

    /// Script a raw text frame.
    pub(crate) fn push_frame(&mut self, text: impl Into<String>) {
        self.incoming.push_back(ScriptedRead::Frame(text.into()));
    }

    /// Script an event frame.
    pub(crate) fn push_event(&mut self, method: &str, params: Value) {
        self.push_frame(json!({ "method": method, "params": params }).to_string());
    }

    /// Script a success reply.
    pub(crate) fn push_reply(&mut self, id: u64, result: Value) {
        self.push_frame(json!({ "id": id, "result": result }).to_string());
    }

    /// Script an error reply.
    pub(crate) fn push_error_reply(&mut self, id: u64, code: i64, message: &str) {
        self.push_frame(
            json!({ "id": id, "error": { "code": code, "message": message } }).to_string(),
        );
    }

    /// Script one idle read timeout.
    pub(crate) fn push_idle(&mut self) {
        self.incoming.push_back(ScriptedRead::Idle);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_text(&mut self, payload: String) -> Result<()> {
        let value: Value = serde_json::from_str(&payload)?;
        self.sent.lock().expect("send log poisoned").push(value);
        Ok(())
    }

    async fn receive(&mut self, read_timeout: Duration) -> Result<String> {
        match self.incoming.pop_front() {
            Some(ScriptedRead::Frame(text)) => Ok(text),
            Some(ScriptedRead::Idle) => {
                // Yield so deadline loops cannot starve the runtime.
                tokio::time::sleep(Duration::from_millis(1)).await;
                Err(Error::socket_timeout(read_timeout))
            }
            None if self.idle_when_empty => {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Err(Error::socket_timeout(read_timeout))
            }
            None => Err(Error::ConnectionClosed),
        }
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
