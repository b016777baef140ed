//! Uniform response envelope.
//!
//! Every public engine operation returns a [`ServiceResponse`]. Failures are
//! data, not panics: the engine's catch-all boundary folds internal errors
//! into a failure envelope carrying the error kind and text.

use serde::{Deserialize, Serialize};

/// Outcome discriminator of a [`ServiceResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    Success,
    Failure,
}

/// Response envelope for engine operations.
///
/// `payload` is present on success when the operation produces a value, and
/// occasionally on failure when an existing resource explains the conflict
/// (for example the already-registered container on a duplicate create).
///
/// # Example
///
/// ```
/// use berth_types::ServiceResponse;
///
/// let ok: ServiceResponse<u32> = ServiceResponse::success("done", 7);
/// assert!(ok.is_success());
/// assert_eq!(ok.payload, Some(7));
///
/// let err: ServiceResponse<u32> = ServiceResponse::failure("missing");
/// assert!(err.is_failure());
/// assert!(err.payload.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub kind: ResponseKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> ServiceResponse<T> {
    /// Success carrying a payload.
    #[must_use]
    pub fn success(message: impl Into<String>, payload: T) -> Self {
        Self {
            kind: ResponseKind::Success,
            message: message.into(),
            payload: Some(payload),
        }
    }

    /// Success without a payload.
    #[must_use]
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Success,
            message: message.into(),
            payload: None,
        }
    }

    /// Failure without a payload.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Failure,
            message: message.into(),
            payload: None,
        }
    }

    /// Failure that still carries a resource, such as the existing container
    /// on a conflicting create.
    #[must_use]
    pub fn failure_with(message: impl Into<String>, payload: T) -> Self {
        Self {
            kind: ResponseKind::Failure,
            message: message.into(),
            payload: Some(payload),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.kind == ResponseKind::Success
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.kind == ResponseKind::Failure
    }
}
