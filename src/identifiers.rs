//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time:
//! a command correlation id is a counter local to one connection, while
//! target/frame/context ids are opaque strings minted by the browser.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Command correlation id.
///
/// Unique for the lifetime of a [`Connection`](crate::transport::Connection):
/// assigned at send time, monotonically increasing from 1, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// The id assigned to the first command on a fresh connection.
    pub const FIRST: CommandId = CommandId(1);

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    /// Returns the id that follows this one.
    #[inline]
    #[must_use]
    pub fn next(self) -> CommandId {
        CommandId(self.0 + 1)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// String identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier received from the browser.
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id! {
    /// Remote identifier for a debugging target (a tab or page).
    TargetId
}

string_id! {
    /// Remote identifier for a frame inside a target.
    FrameId
}

string_id! {
    /// Remote identifier for an isolated browsing context.
    ContextId
}

string_id! {
    /// Remote identifier for an in-flight network request.
    NetworkRequestId
}

// ============================================================================
// Tests
// ============================================================================
