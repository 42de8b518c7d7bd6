//! Browser-level context manager.
//!
//! [`Browser`] owns the browser-wide debugger connection (as opposed to a
//! per-page one) and is responsible for bootstrap: probing the version
//! endpoint, detecting headless mode, and producing an isolated target for
//! a [`Page`](crate::browser::Page) to attach to.
//!
//! Headless builds get a dedicated browser context (isolated cookies and
//! storage, disposable as a unit). Windowed builds, and older builds that
//! reject the context commands, fall back to plain tab creation over HTTP.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::browser::BLANK_PAGE_URL;
use crate::client::DevToolsClient;
use crate::error::{Error, Result};
use crate::http::HttpBootstrap;
use crate::identifiers::{ContextId, TargetId};
use crate::logger::DebugLogger;
use crate::protocol::Event;
use crate::transport::{Connection, DEFAULT_READ_TIMEOUT};

// ============================================================================
// Version Probe
// ============================================================================

/// Relevant slice of the version endpoint's body.
#[derive(Debug, Deserialize)]
struct VersionInfo {
    /// Product string, e.g. `HeadlessChrome/119.0.6045.105`.
    #[serde(rename = "Browser")]
    browser: String,

    /// Browser-wide debugger socket, absent on some windowed builds.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    debugger_url: Option<String>,
}

/// Major version from a product string like `HeadlessChrome/119.0.6045.105`.
fn parse_major_version(browser: &str) -> Option<u32> {
    let (_, version) = browser.split_once('/')?;
    let major = version.split('.').next()?;
    major.parse().ok()
}

/// Body of a windowed-mode tab creation.
#[derive(Debug, Deserialize)]
struct NewTab {
    id: String,
}

// ============================================================================
// Browser
// ============================================================================

/// Browser-level manager: version probe, context and target setup.
#[derive(Debug)]
pub struct Browser {
    connection: Connection,
    http: HttpBootstrap,

    /// The dedicated browser context, when running headless.
    context_id: Option<ContextId>,

    /// Detected from the version probe; assumed until then.
    headless: bool,

    /// Major browser version from the probe, 0 when unparseable.
    version: u32,
}

impl Browser {
    /// Creates a manager for the debugger at the given HTTP base address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the address is not a valid URL.
    pub fn new(http_base: &str, logger: Arc<DebugLogger>) -> Result<Self> {
        Ok(Self {
            connection: Connection::new("browser", DEFAULT_READ_TIMEOUT, logger),
            http: HttpBootstrap::new(http_base)?,
            context_id: None,
            headless: true,
            version: 0,
        })
    }

    /// Probes the browser and produces a fresh, isolated page target.
    ///
    /// Headless browsers get the target inside a dedicated browser
    /// context; windowed browsers (including builds that reject the
    /// context commands with a capability error) get a plain new tab.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] with the probed URL and the raw body
    /// when the version endpoint cannot be parsed.
    pub async fn start(&mut self) -> Result<TargetId> {
        let probe_url = self.http.endpoint("/json/version")?;
        let body = self.http.get("/json/version").await?;
        let info: VersionInfo = serde_json::from_str(&body).map_err(|_| {
            Error::config(format!(
                "cannot parse version probe from {probe_url}: {body:?}"
            ))
        })?;

        self.version = parse_major_version(&info.browser).unwrap_or(0);
        self.headless = info.browser.contains("Headless");

        if self.headless {
            let debugger_url = info.debugger_url.ok_or_else(|| {
                Error::config(format!(
                    "headless browser at {probe_url} advertises no debugger socket"
                ))
            })?;
            self.connection.connect(&debugger_url).await?;

            match self.create_headless_target().await {
                Ok(target) => return Ok(target),
                // Old build without browser-context support; treat it
                // like a windowed browser.
                Err(e) if e.is_capability_unsupported() => self.headless = false,
                Err(e) => return Err(e),
            }
        }

        self.create_windowed_target().await
    }

    /// Creates an isolated browser context and a blank target inside it.
    async fn create_headless_target(&mut self) -> Result<TargetId> {
        let result = self.send("Target.createBrowserContext", Value::Null).await?;
        let context_id = result
            .get("browserContextId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("created browser context carries no id"))?
            .to_owned();
        self.context_id = Some(ContextId::from(context_id.as_str()));

        let result = self
            .send(
                "Target.createTarget",
                json!({ "url": BLANK_PAGE_URL, "browserContextId": context_id }),
            )
            .await?;
        let target = result
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("created target carries no id"))?;
        Ok(TargetId::from(target))
    }

    /// Creates a plain new tab over HTTP (windowed mode).
    async fn create_windowed_target(&mut self) -> Result<TargetId> {
        let body = self.http.put("/json/new").await?;
        let tab: NewTab = serde_json::from_str(&body)
            .map_err(|_| Error::config(format!("cannot parse tab creation response: {body:?}")))?;
        Ok(TargetId::from(tab.id.as_str()))
    }

    /// Disposes the browser context (when one was created) and closes the
    /// browser connection.
    ///
    /// A failed disposal is reported as a connection-level error; the
    /// socket is closed either way.
    pub async fn close(&mut self) -> Result<()> {
        let disposed = match self.context_id.take() {
            Some(context_id) => self
                .send(
                    "Target.disposeBrowserContext",
                    json!({ "browserContextId": context_id.as_str() }),
                )
                .await
                .map(|_| ())
                .map_err(|e| {
                    Error::connection(format!(
                        "could not dispose browser context {context_id}: {e}"
                    ))
                }),
            None => Ok(()),
        };

        let closed = self.connection.close().await;
        disposed?;
        closed
    }

    /// Whether the probed browser runs headless.
    #[inline]
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Major browser version from the probe, 0 when unparseable.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Debugger websocket URL for one page target.
    pub fn page_socket_url(&self, target: &TargetId) -> Result<String> {
        self.http.page_debugger_url(target)
    }
}

// ============================================================================
// Event Routing
// ============================================================================

#[async_trait]
impl DevToolsClient for Browser {
    fn connection(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// The browser-wide connection subscribes to nothing; whatever still
    /// arrives is irrelevant to context management.
    async fn on_event(&mut self, _event: &Event) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::FakeTransport;

    fn browser(transport: FakeTransport) -> Browser {
        Browser {
            connection: Connection::with_transport(
                "browser",
                Box::new(transport),
                Arc::new(DebugLogger::new()),
            ),
            http: HttpBootstrap::new("http://localhost:9222").expect("base"),
            context_id: None,
            headless: true,
            version: 0,
        }
    }

    #[test]
    fn test_parse_major_version() {
        assert_eq!(parse_major_version("HeadlessChrome/119.0.6045.105"), Some(119));
        assert_eq!(parse_major_version("Chrome/90.0.4430.93"), Some(90));
        assert_eq!(parse_major_version("NoSlashHere"), None);
        assert_eq!(parse_major_version("Chrome/not.a.number"), None);
    }

    #[tokio::test]
    async fn test_headless_target_lives_in_a_dedicated_context() {
        let (mut transport, sent) = FakeTransport::new();
        transport.push_reply(1, json!({ "browserContextId": "CTX-1" }));
        transport.push_reply(2, json!({ "targetId": "TARGET-1" }));
        let mut browser = browser(transport);

        let target = browser.create_headless_target().await.unwrap();

        assert_eq!(target.as_str(), "TARGET-1");
        assert_eq!(browser.context_id.as_ref().unwrap().as_str(), "CTX-1");
        let sent = sent.lock().unwrap();
        assert_eq!(sent[0]["method"], "Target.createBrowserContext");
        assert_eq!(sent[1]["method"], "Target.createTarget");
        assert_eq!(sent[1]["params"]["url"], "about:blank");
        assert_eq!(sent[1]["params"]["browserContextId"], "CTX-1");
    }

    #[tokio::test]
    async fn test_missing_context_support_reads_as_capability_error() {
        let (mut transport, _sent) = FakeTransport::new();
        transport.push_error_reply(1, -32601, "'Target.createBrowserContext' wasn't found");
        let mut browser = browser(transport);

        let err = browser.create_headless_target().await.unwrap_err();
        assert!(err.is_capability_unsupported());
    }

    #[tokio::test]
    async fn test_close_disposes_the_context_first() {
        let (mut transport, sent) = FakeTransport::new();
        transport.push_reply(1, json!({}));
        let mut browser = browser(transport);
        browser.context_id = Some(ContextId::from("CTX-1"));

        browser.close().await.unwrap();

        assert!(browser.context_id.is_none());
        let sent = sent.lock().unwrap();
        assert_eq!(sent[0]["method"], "Target.disposeBrowserContext");
        assert_eq!(sent[0]["params"]["browserContextId"], "CTX-1");
    }

    #[tokio::test]
    async fn test_failed_disposal_is_a_connection_error() {
        let (mut transport, _sent) = FakeTransport::new();
        transport.push_error_reply(1, -32000, "Failed to find context");
        let mut browser = browser(transport);
        browser.context_id = Some(ContextId::from("CTX-GONE"));

        let err = browser.close().await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_close_without_context_only_closes_the_socket() {
        let (transport, sent) = FakeTransport::new();
        let mut browser = browser(transport);

        browser.close().await.unwrap();
        assert!(sent.lock().unwrap().is_empty());
    }
}
