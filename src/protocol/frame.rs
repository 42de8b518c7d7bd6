//! Incoming frame decoding.
//!
//! One decoded message unit from the socket is a [`Frame`]: either a
//! [`Reply`] answering a specific command (matched by id) or an unsolicited
//! [`Event`]. There is no third shape; anything else is a protocol error.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

// ============================================================================
// RemoteError
// ============================================================================

/// Error object carried by an error reply, passed through verbatim.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    /// Remote error code.
    pub code: i64,

    /// Remote error message.
    pub message: String,

    /// Optional detail string.
    #[serde(default)]
    pub data: Option<String>,
}

impl RemoteError {
    /// Error codes with which browser builds lacking browser-context
    /// support reject `Target.createBrowserContext`.
    #[inline]
    #[must_use]
    pub fn is_unsupported_code(code: i64) -> bool {
        code == -32601 || code == -32000
    }

    /// Message with the `data` detail appended when present.
    #[must_use]
    pub fn full_message(&self) -> String {
        match &self.data {
            Some(data) => format!("{}. {}", self.message, data),
            None => self.message.clone(),
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A frame answering a previously sent command.
#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    /// Matches the command's id.
    pub id: CommandId,

    /// Result payload (absent on error replies and on some void methods).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload (absent on success).
    #[serde(default)]
    pub error: Option<RemoteError>,
}

// ============================================================================
// Event
// ============================================================================

/// An unsolicited frame describing something that happened remotely.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `Domain.event` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Gets a string parameter.
    #[inline]
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// The frame id this event pertains to, if it carries one.
    #[inline]
    #[must_use]
    pub fn frame_id(&self) -> Option<&str> {
        self.param_str("frameId")
    }
}

// ============================================================================
// Frame
// ============================================================================

/// One decoded message unit from the socket.
#[derive(Debug, Clone)]
pub enum Frame {
    /// Answer to a specific command.
    Reply(Reply),
    /// Unsolicited notification.
    Event(Event),
}

impl Frame {
    /// Decodes an incoming text payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for empty, `null`, non-object or
    /// otherwise unclassifiable payloads — there is no legitimate case
    /// that produces one on this protocol, so it is treated as an
    /// unrecoverable desynchronization rather than skipped.
    pub fn decode(text: &str) -> Result<Frame> {
        if text.trim().is_empty() {
            return Err(Error::protocol("empty payload from browser websocket"));
        }

        let value: Value = serde_json::from_str(text)?;
        match &value {
            Value::Object(map) => {
                if map.contains_key("id") {
                    Ok(Frame::Reply(serde_json::from_value(value)?))
                } else if map.contains_key("method") {
                    Ok(Frame::Event(serde_json::from_value(value)?))
                } else {
                    Err(Error::protocol(format!(
                        "frame is neither a reply nor an event: {text}"
                    )))
                }
            }
            _ => Err(Error::protocol(format!(
                "non-object payload from browser websocket: {text}"
            ))),
        }
    }

    /// The reply id, if this frame is a reply.
    #[inline]
    #[must_use]
    pub fn reply_id(&self) -> Option<CommandId> {
        match self {
            Frame::Reply(reply) => Some(reply.id),
            Frame::Event(_) => None,
        }
    }

    /// The event, if this frame is one.
    #[inline]
    #[must_use]
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Frame::Event(event) => Some(event),
            Frame::Reply(_) => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Command;
    use proptest::prelude::*;

    #[test]
    fn test_decode_success_reply() {
        let frame = Frame::decode(r#"{"id": 7, "result": {"frameId": "F1"}}"#).expect("decode");
        match frame {
            Frame::Reply(reply) => {
                assert_eq!(reply.id.value(), 7);
                assert!(reply.error.is_none());
                assert_eq!(reply.result.unwrap()["frameId"], "F1");
            }
            Frame::Event(_) => panic!("expected a reply"),
        }
    }

    #[test]
    fn test_decode_error_reply() {
        let frame = Frame::decode(
            r#"{"id": 3, "error": {"code": -32601, "message": "not found", "data": "detail"}}"#,
        )
        .expect("decode");
        match frame {
            Frame::Reply(reply) => {
                let error = reply.error.expect("error object");
                assert_eq!(error.code, -32601);
                assert_eq!(error.full_message(), "not found. detail");
            }
            Frame::Event(_) => panic!("expected a reply"),
        }
    }

    #[test]
    fn test_decode_event() {
        let frame = Frame::decode(
            r#"{"method": "Page.frameStartedLoading", "params": {"frameId": "F1"}}"#,
        )
        .expect("decode");
        let event = frame.as_event().expect("event");
        assert_eq!(event.method, "Page.frameStartedLoading");
        assert_eq!(event.frame_id(), Some("F1"));
        assert!(frame.reply_id().is_none());
    }

    #[test]
    fn test_decode_event_without_params() {
        let frame = Frame::decode(r#"{"method": "Page.loadEventFired"}"#).expect("decode");
        let event = frame.as_event().expect("event");
        assert!(event.frame_id().is_none());
        assert!(event.param_str("timestamp").is_none());
    }

    #[test]
    fn test_decode_null_payload_is_fatal() {
        assert!(matches!(
            Frame::decode("null"),
            Err(Error::Protocol { .. })
        ));
    }

    #[test]
    fn test_decode_empty_payload_is_fatal() {
        assert!(matches!(Frame::decode("  "), Err(Error::Protocol { .. })));
    }

    #[test]
    fn test_decode_unclassifiable_object_is_fatal() {
        assert!(matches!(
            Frame::decode(r#"{"result": {}}"#),
            Err(Error::Protocol { .. })
        ));
    }

    proptest! {
        // Encoding a command and decoding the synthetic reply recovers the id.
        #[test]
        fn prop_command_id_round_trips(raw in 1u64..u64::MAX) {
            let mut id = CommandId::FIRST;
            for _ in 0..(raw % 64) {
                id = id.next();
            }
            let command = Command::new(id, "Runtime.evaluate", serde_json::json!({"expression": "1"}));
            let wire = command.encode().unwrap();
            let sent: Value = serde_json::from_str(&wire).unwrap();

            let reply_text = format!(r#"{{"id": {}, "result": {{}}}}"#, sent["id"]);
            let frame = Frame::decode(&reply_text).unwrap();
            prop_assert_eq!(frame.reply_id(), Some(command.id));
        }
    }
}
