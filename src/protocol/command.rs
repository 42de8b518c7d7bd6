//! Outgoing command envelope.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::CommandId;

// ============================================================================
// Command
// ============================================================================

/// A single protocol command. Immutable once built.
///
/// # Format
///
/// ```json
/// { "id": 12, "method": "Page.navigate", "params": { "url": "…" } }
/// ```
///
/// `params` is omitted from the envelope when empty: some protocol methods
/// reject an explicit empty object.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    /// Correlation id, unique for the lifetime of the connection.
    pub id: CommandId,

    /// Method name in `Domain.method` format.
    pub method: String,

    /// Method parameters.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Command {
    /// Creates a command, normalizing empty params away.
    #[must_use]
    pub fn new(id: CommandId, method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) if map.is_empty() => Value::Null,
            other => other,
        };
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Encodes the command to its wire envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the params cannot be
    /// serialized.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
