//! Browser entities module.
//!
//! This module provides the two connection consumers of the driver:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Browser`] | Browser-level manager (version probe, context + target setup) |
//! | [`Page`] | Page lifecycle state machine (navigation, dialogs, crash recovery) |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chrome_devtools_driver::{Browser, DebugLogger, Page, PageOptions, Result};
//!
//! # async fn example() -> Result<()> {
//! let logger = Arc::new(DebugLogger::new());
//! let mut browser = Browser::new("http://localhost:9222", Arc::clone(&logger))?;
//! let target = browser.start().await?;
//!
//! let mut page = Page::new(&target, PageOptions::default(), logger);
//! page.connect(&browser.page_socket_url(&target)?).await?;
//!
//! page.visit("https://example.com").await?;
//! page.wait_for_load().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Browser-level context manager.
pub mod context;

/// Page lifecycle state machine.
pub mod page;

// ============================================================================
// Constants
// ============================================================================

/// Neutral page every fresh or recovered target is parked on.
pub(crate) const BLANK_PAGE_URL: &str = "about:blank";

// ============================================================================
// Re-exports
// ============================================================================

pub use context::Browser;
pub use page::{ConsoleMessage, DialogDecision, DialogHandler, DialogInfo, Page, PageOptions};
