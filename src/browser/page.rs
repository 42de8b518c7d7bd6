//! Page lifecycle state machine.
//!
//! A [`Page`] exclusively owns the websocket to one render target and
//! tracks everything the protocol reports about it: readiness, main-frame
//! identity, pending main-document requests, the console buffer, open
//! javascript dialogs and crashes. All tracking happens in
//! [`on_event`](crate::client::DevToolsClient::on_event), which the wait
//! loop invokes for every event frame it reads — including frames read
//! while waiting for an unrelated reply, so nothing is ever missed.
//!
//! # Readiness
//!
//! A page starts ready and flips not-ready the moment a navigation is
//! *requested*, before the browser confirms anything, so that a
//! load-event that races the navigate reply cannot be mistaken for the
//! previous page's. Frame-scoped events for any frame other than the
//! owned main frame are ignored.
//!
//! # Dialogs and crashes
//!
//! Both are handled inside event routing: a dialog is always answered at
//! the protocol level (the browser must never stay blocked on it) before
//! any local failure is surfaced, and a crashed target is navigated back
//! to a blank page before the interrupted operation is failed.

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::fmt;
use std::result::Result as StdResult;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::browser::BLANK_PAGE_URL;
use crate::client::DevToolsClient;
use crate::error::{Error, Result};
use crate::identifiers::{FrameId, NetworkRequestId, TargetId};
use crate::logger::DebugLogger;
use crate::protocol::{Event, Frame};
use crate::transport::{Connection, DEFAULT_READ_TIMEOUT};

// ============================================================================
// Constants
// ============================================================================

/// Default bound on a single page load.
const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Animations are not disabled, just finished almost instantly.
const ANIMATION_PLAYBACK_RATE: u64 = 100_000;

/// Dialog kind whose unhandled default is accept rather than dismiss;
/// dismissing it would strand the page mid-unload.
const BEFORE_UNLOAD: &str = "beforeunload";

// ============================================================================
// PageOptions
// ============================================================================

/// Tunables for one page connection.
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Socket-level read window (see [`DEFAULT_READ_TIMEOUT`]).
    pub read_timeout: Duration,

    /// Bound on a page load, armed at every not-ready transition.
    pub load_timeout: Duration,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }
}

// ============================================================================
// ConsoleMessage
// ============================================================================

/// One buffered console record.
///
/// Lenient on purpose: the browser's console payloads vary between
/// versions, and a missing field must never poison the event stream.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsoleMessage {
    /// Origin subsystem (`console-api`, `javascript`, `network`, ...).
    pub source: String,

    /// Severity (`log`, `warning`, `error`, ...).
    pub level: String,

    /// The message text.
    pub text: String,

    /// Script URL, when attributable.
    pub url: Option<String>,

    /// Line number, when attributable.
    pub line: Option<u64>,
}

// ============================================================================
// Dialogs
// ============================================================================

/// What the browser reported about an opening javascript dialog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DialogInfo {
    /// Dialog kind: `alert`, `confirm`, `prompt` or `beforeunload`.
    #[serde(rename = "type")]
    pub dialog_type: String,

    /// The dialog's message text.
    pub message: String,

    /// URL of the page that opened it.
    pub url: String,

    /// Prefilled prompt text, for `prompt` dialogs.
    #[serde(rename = "defaultPrompt")]
    pub default_prompt: Option<String>,
}

/// How to answer a javascript dialog.
#[derive(Debug, Clone, Default)]
pub struct DialogDecision {
    /// Accept (OK) or dismiss (Cancel).
    pub accept: bool,

    /// Text to enter before accepting, for `prompt` dialogs.
    pub prompt_text: String,
}

impl DialogDecision {
    /// Accepts the dialog.
    #[must_use]
    pub fn accept() -> Self {
        Self {
            accept: true,
            prompt_text: String::new(),
        }
    }

    /// Accepts a prompt with the given text.
    #[must_use]
    pub fn accept_with(text: impl Into<String>) -> Self {
        Self {
            accept: true,
            prompt_text: text.into(),
        }
    }

    /// Dismisses the dialog.
    #[must_use]
    pub fn dismiss() -> Self {
        Self::default()
    }
}

/// Caller-registered dialog policy.
///
/// Returning an error (or never registering a handler) still answers the
/// dialog at the protocol level — accept for `beforeunload`, dismiss
/// otherwise — and then fails the in-flight operation with
/// [`Error::UnexpectedDialog`].
pub type DialogHandler =
    Box<dyn Fn(&DialogInfo) -> StdResult<DialogDecision, Box<dyn StdError + Send + Sync>> + Send + Sync>;

// ============================================================================
// Page
// ============================================================================

/// Lifecycle state machine for one render target.
pub struct Page {
    connection: Connection,
    options: PageOptions,
    logger: Arc<DebugLogger>,

    /// Main frame id, resolved during [`connect`](Page::connect).
    main_frame: Option<FrameId>,

    /// Whether the current document has finished loading. Starts `true`;
    /// flipped pessimistically before any navigation is sent.
    ready: bool,

    /// Deadline armed at the most recent ready→not-ready transition.
    ready_deadline: Option<Instant>,

    /// Whether anything was navigated since the last reset.
    has_navigated: bool,

    /// Set while crash recovery is in flight; cleared only by the
    /// browser's reloaded-after-crash notification.
    recovering: bool,

    /// Main-document requests sent but not yet answered.
    pending_documents: FxHashSet<NetworkRequestId>,

    /// Response descriptor of the most recent main-document load.
    last_response: Option<Value>,

    console: Vec<ConsoleMessage>,
    dialog_handler: Option<DialogHandler>,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("connection", &self.connection)
            .field("main_frame", &self.main_frame)
            .field("ready", &self.ready)
            .field("has_navigated", &self.has_navigated)
            .field("recovering", &self.recovering)
            .field("pending_documents", &self.pending_documents.len())
            .field("console", &self.console.len())
            .field("dialog_handler", &self.dialog_handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Creates an unconnected page for the given target.
    #[must_use]
    pub fn new(target: &TargetId, options: PageOptions, logger: Arc<DebugLogger>) -> Self {
        let connection = Connection::new(
            format!("page:{target}"),
            options.read_timeout,
            Arc::clone(&logger),
        );
        Self {
            connection,
            options,
            logger,
            main_frame: None,
            ready: true,
            ready_deadline: None,
            has_navigated: false,
            recovering: false,
            pending_documents: FxHashSet::default(),
            last_response: None,
            console: Vec::new(),
            dialog_handler: None,
        }
    }

    /// Opens the debugger socket and prepares the target.
    ///
    /// Enables the `Page`, `DOM`, `Network`, `Console` and `Animation`
    /// domains (animations at a playback rate that finishes them almost
    /// instantly) and resolves the main frame id.
    pub async fn connect(&mut self, url: &str) -> Result<()> {
        self.connection.connect(url).await?;
        self.initialize().await
    }

    async fn initialize(&mut self) -> Result<()> {
        self.send("Page.enable", Value::Null).await?;
        self.send("DOM.enable", Value::Null).await?;
        self.send("Network.enable", Value::Null).await?;
        self.send("Console.enable", Value::Null).await?;
        self.send("Animation.enable", Value::Null).await?;
        self.send(
            "Animation.setPlaybackRate",
            json!({ "playbackRate": ANIMATION_PLAYBACK_RATE }),
        )
        .await?;

        let tree = self.send("Page.getFrameTree", Value::Null).await?;
        let frame_id = tree
            .pointer("/frameTree/frame/id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("frame tree carries no main frame id"))?;
        self.main_frame = Some(FrameId::from(frame_id));
        Ok(())
    }

    /// Navigates to `url`.
    ///
    /// Flips not-ready before the navigate command is even sent, so a
    /// racing load event cannot be attributed to the wrong document.
    /// Outstanding main-document requests from the previous navigation
    /// are drained first.
    pub async fn visit(&mut self, url: &str) -> Result<()> {
        if !self.pending_documents.is_empty() {
            let deadline = Instant::now() + self.options.load_timeout;
            self.wait_for(
                |page: &Self, _: &Frame| page.pending_documents.is_empty(),
                "drain-pending-documents",
                Some(deadline),
            )
            .await?;
        }

        self.begin_navigation("visit");
        self.has_navigated = true;
        self.send("Page.navigate", json!({ "url": url })).await?;
        Ok(())
    }

    /// Reloads the current document.
    pub async fn reload(&mut self) -> Result<()> {
        self.begin_navigation("reload");
        self.send("Page.reload", Value::Null).await?;
        Ok(())
    }

    /// Blocks until the current document is loaded.
    ///
    /// No-op when already ready. The deadline is the one armed when the
    /// page went not-ready, not a fresh window — two consecutive callers
    /// never double the waiting time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PageNotLoaded`] wrapping the underlying wait
    /// failure.
    pub async fn wait_for_load(&mut self) -> Result<()> {
        if self.ready {
            return Ok(());
        }

        let deadline = self
            .ready_deadline
            .unwrap_or_else(|| Instant::now() + self.options.load_timeout);

        self.wait_for(|page: &Self, _: &Frame| page.ready, "wait-for-load", Some(deadline))
            .await
            .map_err(Error::page_not_loaded)?;
        Ok(())
    }

    /// Returns the page to a neutral blank state between uses.
    ///
    /// No protocol traffic at all when nothing was navigated since the
    /// last reset. The navigation flag and the dialog handler are
    /// released on every exit path, success or failure.
    pub async fn reset(&mut self) -> Result<()> {
        if !self.has_navigated {
            return Ok(());
        }

        let result = async {
            self.visit(BLANK_PAGE_URL).await?;
            self.wait_for_load().await
        }
        .await;

        self.has_navigated = false;
        self.dialog_handler = None;
        result
    }

    /// Installs the dialog policy, replacing any previous one.
    pub fn register_dialog_handler<F>(&mut self, handler: F)
    where
        F: Fn(&DialogInfo) -> StdResult<DialogDecision, Box<dyn StdError + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        self.dialog_handler = Some(Box::new(handler));
    }

    /// Buffered console records, oldest first.
    #[inline]
    #[must_use]
    pub fn console_messages(&self) -> &[ConsoleMessage] {
        &self.console
    }

    /// Drops all buffered console records.
    #[inline]
    pub fn clear_console_messages(&mut self) {
        self.console.clear();
    }

    /// Response descriptor of the most recent main-document load, if any.
    #[inline]
    #[must_use]
    pub fn last_response(&self) -> Option<&Value> {
        self.last_response.as_ref()
    }

    /// Whether the current document has finished loading.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Closes the debugger socket.
    pub async fn close(&mut self) -> Result<()> {
        self.connection.close().await
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    /// Common prologue of `visit` and `reload`: forgets the previous
    /// document's response, flips not-ready and arms a fresh load
    /// deadline, superseding any deadline left over from an earlier
    /// transition (e.g. a dangling frame-started-loading).
    fn begin_navigation(&mut self, trigger: &str) {
        self.last_response = None;
        self.set_ready(false, trigger);
        self.ready_deadline = Some(Instant::now() + self.options.load_timeout);
    }

    fn set_ready(&mut self, ready: bool, trigger: &str) {
        if self.ready != ready {
            self.logger
                .ready_state_change(self.connection.label(), ready, trigger);
        }
        self.ready = ready;
        if ready {
            self.ready_deadline = None;
        } else if self.ready_deadline.is_none() {
            self.ready_deadline = Some(Instant::now() + self.options.load_timeout);
        }
    }

    /// Whether a frame-scoped event concerns the owned main frame.
    ///
    /// Events without a frame id belong to the owned page (the connection
    /// is per-target).
    fn is_own_frame(&self, event: &Event) -> bool {
        match (event.frame_id(), &self.main_frame) {
            (Some(id), Some(own)) => id == own.as_str(),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    // ========================================================================
    // Dialog handshake
    // ========================================================================

    /// Answers an opening dialog, always at the protocol level first.
    ///
    /// The browser blocks the page until the dialog is answered, so the
    /// answer is sent unconditionally — only then is a local failure
    /// (missing or erroring handler) surfaced.
    async fn handle_dialog(&mut self, event: &Event) -> Result<()> {
        let info: DialogInfo = serde_json::from_value(event.params.clone()).unwrap_or_default();

        let outcome = match &self.dialog_handler {
            Some(handler) => handler(&info).map_err(|e| e.to_string()),
            None => Err("no javascript dialog handler was registered".to_string()),
        };

        let (decision, failure) = match outcome {
            Ok(decision) => (decision, None),
            Err(reason) => {
                let fallback = DialogDecision {
                    accept: info.dialog_type == BEFORE_UNLOAD,
                    prompt_text: String::new(),
                };
                (fallback, Some(reason))
            }
        };

        self.send(
            "Page.handleJavaScriptDialog",
            json!({ "accept": decision.accept, "promptText": decision.prompt_text }),
        )
        .await?;

        match failure {
            None => Ok(()),
            Some(reason) => Err(Error::unexpected_dialog(
                info.dialog_type,
                info.message,
                reason,
            )),
        }
    }

    // ========================================================================
    // Crash recovery
    // ========================================================================

    /// Recovers a crashed target, then fails the interrupted operation.
    ///
    /// Never returns `Ok`: the operation that was in flight when the
    /// target crashed cannot be assumed to have completed, so it fails
    /// with [`Error::TargetCrashed`] even when recovery itself worked.
    /// Recovery never recurses — a second crash notification while
    /// recovering fails outright.
    async fn handle_crash(&mut self) -> Result<()> {
        if self.recovering {
            return Err(Error::crash_recovery_failed(Error::protocol(
                "target crashed again during crash recovery",
            )));
        }

        self.recovering = true;
        self.set_ready(false, "crash-recovery");
        let deadline = Instant::now() + self.options.load_timeout;

        let recovery = async {
            self.send_until(
                "Page.navigate",
                json!({ "url": BLANK_PAGE_URL }),
                Some(deadline),
            )
            .await?;
            self.wait_for(
                |page: &Self, _: &Frame| page.ready && !page.recovering,
                "crash-recovery",
                Some(deadline),
            )
            .await?;
            Ok(())
        }
        .await;

        match recovery {
            Ok(()) => Err(Error::TargetCrashed),
            Err(source) => Err(Error::crash_recovery_failed(source)),
        }
    }
}

// ============================================================================
// Event Routing
// ============================================================================

#[async_trait]
impl DevToolsClient for Page {
    fn connection(&mut self) -> &mut Connection {
        &mut self.connection
    }

    async fn on_event(&mut self, event: &Event) -> Result<()> {
        match event.method.as_str() {
            "Page.frameStartedLoading" if self.is_own_frame(event) => {
                self.set_ready(false, "frameStartedLoading");
            }
            "Page.navigatedWithinDocument" if self.is_own_frame(event) => {
                self.set_ready(true, "navigatedWithinDocument");
            }
            "Page.loadEventFired" => {
                self.set_ready(true, "loadEventFired");
            }

            "Page.javascriptDialogOpening" => {
                return self.handle_dialog(event).await;
            }

            "Inspector.targetCrashed" => {
                return self.handle_crash().await;
            }
            "Inspector.targetReloadedAfterCrash" => {
                self.recovering = false;
            }

            "Console.messageAdded" => {
                if let Some(message) = event.params.get("message") {
                    let message: ConsoleMessage =
                        serde_json::from_value(message.clone()).unwrap_or_default();
                    self.console.push(message);
                }
            }

            "Network.requestWillBeSent" => {
                if event.param_str("type") == Some("Document") {
                    if let Some(request_id) = event.param_str("requestId") {
                        self.pending_documents
                            .insert(NetworkRequestId::from(request_id));
                    }
                }
            }
            "Network.responseReceived" => {
                if let Some(request_id) = event.param_str("requestId") {
                    if self
                        .pending_documents
                        .remove(&NetworkRequestId::from(request_id))
                    {
                        self.last_response = event.params.get("response").cloned();
                    }
                }
            }
            "Network.loadingFailed" => {
                if let Some(request_id) = event.param_str("requestId") {
                    self.pending_documents
                        .remove(&NetworkRequestId::from(request_id));
                }
            }

            "Security.certificateError" => {
                if let Some(event_id) = event.params.get("eventId").cloned() {
                    self.set_ready(false, "certificateError");
                    self.send(
                        "Security.handleCertificateError",
                        json!({ "eventId": event_id, "action": "continue" }),
                    )
                    .await?;
                }
            }

            _ => {}
        }
        Ok(())
    }
}

// ============================================================================
// Test Support
// ============================================================================

#[cfg(test)]
impl Page {
    /// Page already wired to a scripted transport, main frame resolved.
    pub(crate) fn test_page(
        transport: crate::transport::testing::FakeTransport,
        options: PageOptions,
    ) -> Self {
        let logger = Arc::new(DebugLogger::new());
        let target = TargetId::from("TARGET-1");
        let mut page = Self::new(&target, options, Arc::clone(&logger));
        page.connection =
            Connection::with_transport("page:test", Box::new(transport), logger);
        page.main_frame = Some(FrameId::from("FRAME-1"));
        page
    }
}

// ============================================================================
// Tests
// ============================================================================
