//! Diagnostic messages attached to the server and to individual containers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// One entry of a message log.
///
/// The engine keeps two independent logs: a server-wide list and one list per
/// container. `details` carries aggregated sub-messages, for example the
/// individual build errors behind a failed release update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            details: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for an [`Severity::Info`] message.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Severity::Info, text)
    }

    /// Shorthand for a [`Severity::Warn`] message.
    #[must_use]
    pub fn warn(text: impl Into<String>) -> Self {
        Self::new(Severity::Warn, text)
    }

    /// Shorthand for an [`Severity::Error`] message.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    /// Attaches sub-messages.
    #[must_use]
    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}
