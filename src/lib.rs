//! Chrome DevTools driver core.
//!
//! An async client for the Chrome DevTools Protocol over its websocket
//! debugger, built around one invariant: a connection has exactly one
//! logical actor, which writes a command and then reads frames until the
//! matching reply arrives, routing every event it passes over. There is
//! no background reader and no shared correlation map; events that arrive
//! mid-command (dialogs opening, the target crashing) are handled inline,
//! where the state they affect lives.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | Wire envelope: command encoding, reply/event frame decoding |
//! | [`identifiers`] | Type-safe command, target, frame, context and request ids |
//! | [`transport`] | Websocket transport and per-target [`Connection`] ownership |
//! | [`client`] | [`DevToolsClient`]: the send / wait-for correlation engine |
//! | [`browser`] | [`Browser`] context manager and the [`Page`] lifecycle state machine |
//! | [`http`] | HTTP bootstrap (version probe, windowed tab creation) |
//! | [`logger`] | Injected wire-level [`DebugLogger`] over `tracing` |
//! | [`error`] | Error taxonomy and [`Result`] alias |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrome_devtools_driver::{
//!     Browser, DebugLogger, DevToolsClient, DialogDecision, Page, PageOptions, Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let logger = Arc::new(DebugLogger::new());
//!
//!     // Probe the browser and obtain an isolated page target.
//!     let mut browser = Browser::new("http://localhost:9222", Arc::clone(&logger))?;
//!     let target = browser.start().await?;
//!
//!     // Attach to it and drive a navigation.
//!     let mut page = Page::new(&target, PageOptions::default(), logger);
//!     page.connect(&browser.page_socket_url(&target)?).await?;
//!     page.register_dialog_handler(|_dialog| Ok(DialogDecision::accept()));
//!
//!     page.visit("https://example.com").await?;
//!     page.wait_for_load().await?;
//!
//!     for message in page.console_messages() {
//!         println!("[{}] {}", message.level, message.text);
//!     }
//!
//!     page.close().await?;
//!     browser.close().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Modules
// ============================================================================

/// Browser and page connection consumers.
pub mod browser;

/// Command correlation engine.
pub mod client;

/// Error types.
pub mod error;

/// HTTP bootstrap collaborator.
pub mod http;

/// Type-safe identifiers.
pub mod identifiers;

/// Wire-level debug logging.
pub mod logger;

/// Wire envelope codec.
pub mod protocol;

/// Socket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

pub use browser::{
    Browser, ConsoleMessage, DialogDecision, DialogHandler, DialogInfo, Page, PageOptions,
};
pub use client::{DEFAULT_COMMAND_DEADLINE, DevToolsClient};
pub use error::{Error, Result};
pub use http::HttpBootstrap;
pub use identifiers::{CommandId, ContextId, FrameId, NetworkRequestId, TargetId};
pub use logger::DebugLogger;
pub use protocol::{Command, Event, Frame, RemoteError, Reply};
pub use transport::{Connection, DEFAULT_READ_TIMEOUT, Transport, WebSocketTransport};
