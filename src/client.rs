//! Command correlation engine.
//!
//! [`DevToolsClient`] is implemented by each connection consumer (a page
//! state machine, or the browser-level context manager). The consumer
//! supplies its [`Connection`] and an event-routing hook; the trait
//! supplies the blocking wait loop that makes the protocol usable from a
//! synchronous, one-command-at-a-time caller.
//!
//! # The wait loop
//!
//! `send` writes a command and then reads frames until the reply with the
//! matching id arrives. Every event frame read in between is handed to
//! [`on_event`](DevToolsClient::on_event) *before* the predicate is
//! checked, so state transitions (a crash notification, a dialog opening)
//! are never lost just because the loop was waiting for an unrelated
//! reply. The protocol offers no way to subscribe to events independently
//! of reading replies on the same socket; a loop that discarded
//! non-matching frames would silently drop them.
//!
//! Event routing may itself send further commands (crash recovery,
//! certificate-error continuation). Those nested sends re-enter the same
//! wait loop recursively on the same connection, which is safe because
//! nothing else is concurrently issuing commands, and bounded because
//! crash recovery does not recover from its own crashes.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::protocol::{Event, Frame};
use crate::transport::Connection;

// ============================================================================
// Constants
// ============================================================================

/// Deadline applied to a command when the caller does not provide one.
///
/// Generous on purpose: exceeding it means the browser has become wedged
/// or unreachable, not merely slow.
pub const DEFAULT_COMMAND_DEADLINE: Duration = Duration::from_secs(90);

// ============================================================================
// DevToolsClient
// ============================================================================

/// A consumer that exclusively owns one [`Connection`] and routes its
/// events.
#[async_trait]
pub trait DevToolsClient: Send {
    /// The connection this consumer exclusively owns.
    fn connection(&mut self) -> &mut Connection;

    /// Observes one event frame, in arrival order, before any predicate
    /// is checked.
    ///
    /// Returning an error fails the in-flight wait (and therefore the
    /// command that drove it) — this is how a crash or an unhandled
    /// dialog surfaces to the caller.
    async fn on_event(&mut self, event: &Event) -> Result<()>;

    /// Sends a command and blocks until its reply arrives, with the
    /// default deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::CommandFailed`] if the browser replied with an error object
    /// - [`Error::Timeout`] if no reply arrived before the deadline
    /// - any error raised by event routing in the meantime
    async fn send(&mut self, method: &str, params: Value) -> Result<Value>
    where
        Self: Sized,
    {
        self.send_until(method, params, None).await
    }

    /// Sends a command and blocks until its reply arrives or `deadline`
    /// passes.
    ///
    /// Returns the reply's `result`; a reply without one yields the
    /// sentinel `{"type": "undefined"}` rather than failing.
    async fn send_until(
        &mut self,
        method: &str,
        params: Value,
        deadline: Option<Instant>,
    ) -> Result<Value>
    where
        Self: Sized,
    {
        let id = self.connection().write_command(method, params).await?;
        let reason = format!("send-{id}");

        let frame = self
            .wait_for(
                move |_: &Self, frame: &Frame| frame.reply_id() == Some(id),
                &reason,
                deadline,
            )
            .await?;

        match frame {
            Frame::Reply(reply) => {
                Ok(reply.result.unwrap_or_else(|| json!({ "type": "undefined" })))
            }
            Frame::Event(_) => Err(Error::protocol(
                "wait loop returned an event for a reply predicate",
            )),
        }
    }

    /// Reads frames until `predicate` accepts one, routing every event in
    /// between.
    ///
    /// `reason` names the wait in logs and timeout messages. Without a
    /// `deadline`, [`DEFAULT_COMMAND_DEADLINE`] applies.
    ///
    /// The predicate sees the consumer itself, so it can wait on consumer
    /// state (e.g. page readiness) as well as on the frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] once the deadline passes — a hard stop, never
    ///   retried; idle socket reads *within* the deadline are retried
    ///   silently
    /// - [`Error::CommandFailed`] if an error reply is read (error replies
    ///   fail the wait outright and are never routed)
    /// - [`Error::ConnectionClosed`] / [`Error::WebSocket`] on transport
    ///   failure, [`Error::Protocol`] on undecodable payloads
    async fn wait_for<P>(
        &mut self,
        predicate: P,
        reason: &str,
        deadline: Option<Instant>,
    ) -> Result<Frame>
    where
        Self: Sized,
        P: Fn(&Self, &Frame) -> bool + Send + Sync,
    {
        let started = Instant::now();
        let deadline = deadline.unwrap_or(started + DEFAULT_COMMAND_DEADLINE);

        loop {
            if Instant::now() > deadline {
                return Err(Error::timeout(reason, started.elapsed()));
            }

            let frame = match self.connection().receive_frame(reason).await {
                Ok(frame) => frame,
                Err(Error::SocketTimeout { .. }) if Instant::now() <= deadline => {
                    // The browser had nothing to say for one read window.
                    // Expected while a page is idle or a slow main-document
                    // response is pending; keep reading.
                    continue;
                }
                Err(Error::SocketTimeout { .. }) => {
                    return Err(Error::timeout(reason, started.elapsed()));
                }
                Err(other) => return Err(other),
            };

            if let Frame::Reply(reply) = &frame {
                if let Some(remote) = &reply.error {
                    return Err(Error::command_failed(remote));
                }
            }

            if let Frame::Event(event) = &frame {
                self.on_event(event).await?;
            }

            if predicate(&*self, &frame) {
                return Ok(frame);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::DebugLogger;
    use crate::transport::testing::FakeTransport;
    use std::sync::Arc;

    /// Minimal consumer that records routed event methods.
    struct Probe {
        connection: Connection,
        seen: Vec<String>,
    }

    #[async_trait]
    impl DevToolsClient for Probe {
        fn connection(&mut self) -> &mut Connection {
            &mut self.connection
        }

        async fn on_event(&mut self, event: &Event) -> Result<()> {
            self.seen.push(event.method.clone());
            Ok(())
        }
    }

    fn probe(transport: FakeTransport) -> Probe {
        Probe {
            connection: Connection::with_transport(
                "probe",
                Box::new(transport),
                Arc::new(DebugLogger::new()),
            ),
            seen: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_send_routes_interleaved_events_before_reply() {
        let (mut transport, _sent) = FakeTransport::new();
        transport.push_event("Page.frameStartedLoading", json!({ "frameId": "F1" }));
        transport.push_event("Console.messageAdded", json!({}));
        transport.push_reply(1, json!({ "ok": true }));
        let mut probe = probe(transport);

        let result = probe.send("Runtime.enable", Value::Null).await.unwrap();
        assert_eq!(result["ok"], true);
        assert_eq!(
            probe.seen,
            vec!["Page.frameStartedLoading", "Console.messageAdded"]
        );
    }

    #[tokio::test]
    async fn test_send_returns_undefined_sentinel_for_bare_reply() {
        let (mut transport, _sent) = FakeTransport::new();
        transport.push_frame(r#"{"id": 1}"#);
        let mut probe = probe(transport);

        let result = probe.send("Page.enable", Value::Null).await.unwrap();
        assert_eq!(result["type"], "undefined");
    }

    #[tokio::test]
    async fn test_error_reply_fails_without_routing() {
        let (mut transport, _sent) = FakeTransport::new();
        transport.push_error_reply(1, -32000, "Cannot navigate");
        let mut probe = probe(transport);

        let err = probe
            .send("Page.navigate", json!({ "url": "bad" }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { code: -32000, .. }));
        assert!(probe.seen.is_empty());
    }

    #[tokio::test]
    async fn test_idle_reads_within_deadline_are_retried() {
        let (mut transport, _sent) = FakeTransport::new();
        transport.push_idle();
        transport.push_idle();
        transport.push_reply(1, json!({}));
        let mut probe = probe(transport);

        let deadline = Instant::now() + Duration::from_secs(5);
        probe
            .send_until("Runtime.enable", Value::Null, Some(deadline))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_deadline_exhaustion_is_a_timeout_not_a_socket_error() {
        let (transport, _sent) = FakeTransport::idle();
        let mut probe = probe(transport);

        let deadline = Instant::now() + Duration::from_millis(50);
        let err = probe
            .wait_for(|_, _| false, "test-wait", Some(deadline))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_event_routing_failure_fails_the_wait() {
        struct Failing {
            connection: Connection,
        }

        #[async_trait]
        impl DevToolsClient for Failing {
            fn connection(&mut self) -> &mut Connection {
                &mut self.connection
            }

            async fn on_event(&mut self, event: &Event) -> Result<()> {
                Err(Error::protocol(format!("boom on {}", event.method)))
            }
        }

        let (mut transport, _sent) = FakeTransport::new();
        transport.push_event("Inspector.targetCrashed", json!({}));
        transport.push_reply(1, json!({}));
        let mut failing = Failing {
            connection: Connection::with_transport(
                "probe",
                Box::new(transport),
                Arc::new(DebugLogger::new()),
            ),
        };

        let err = failing.send("Runtime.enable", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
