//! HTTP bootstrap collaborator.
//!
//! The debugger exposes a small HTTP surface next to its websocket: a
//! version probe, and (on windowed builds without browser-context support)
//! tab creation. [`HttpBootstrap`] wraps just those calls and derives
//! per-target websocket URLs from the same base address. Everything past
//! bootstrap happens over the websocket.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::TargetId;

// ============================================================================
// HttpBootstrap
// ============================================================================

/// Minimal client for the debugger's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpBootstrap {
    base: Url,
    client: reqwest::Client,
}

impl HttpBootstrap {
    /// Creates a bootstrap client for the given base address
    /// (e.g. `http://localhost:9222`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the address is not a valid URL.
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base)
            .map_err(|e| Error::config(format!("invalid browser HTTP address {base:?}: {e}")))?;
        Ok(Self {
            base,
            client: reqwest::Client::new(),
        })
    }

    /// Resolves `path` against the base address.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| Error::config(format!("invalid endpoint path {path:?}: {e}")))
    }

    /// `GET`s an endpoint and returns the raw body.
    pub async fn get(&self, path: &str) -> Result<String> {
        let url = self.endpoint(path)?;
        let body = self.client.get(url).send().await?.text().await?;
        Ok(body)
    }

    /// `PUT`s an endpoint and returns the raw body.
    pub async fn put(&self, path: &str) -> Result<String> {
        let url = self.endpoint(path)?;
        let body = self.client.put(url).send().await?.text().await?;
        Ok(body)
    }

    /// Debugger websocket URL for one page target, derived from the HTTP
    /// base address.
    pub fn page_debugger_url(&self, target: &TargetId) -> Result<String> {
        let host = self
            .base
            .host_str()
            .ok_or_else(|| Error::config(format!("browser address {} has no host", self.base)))?;
        let port = self
            .base
            .port_or_known_default()
            .ok_or_else(|| Error::config(format!("browser address {} has no port", self.base)))?;
        Ok(format!("ws://{host}:{port}/devtools/page/{target}"))
    }
}

// ============================================================================
// Tests
// ============================================================================
