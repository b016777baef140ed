//! Engine error taxonomy.

use thiserror::Error;

use berth_extension::{ArtifactError, ExtensionError};
use berth_types::{ErrorCode, ServiceResponse};

use crate::store::StoreError;

/// Everything that can go wrong inside an engine operation.
///
/// Faults never escape the engine as errors: every public operation renders
/// them into a failure [`ServiceResponse`] carrying `"<CODE>: <text>"`.
/// Seam errors pass their own codes through unchanged.
#[derive(Debug, Error)]
pub enum EngineFault {
    /// A required field was missing from the request.
    #[error("{0}")]
    Validation(String),

    /// The target already exists or is in a state that forbids the request.
    #[error("{0}")]
    Conflict(String),

    /// Unknown container id.
    #[error("{0}")]
    NotFound(String),

    /// The artifact runtime could not materialize or scan a bundle.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// An extension callback failed.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// An extension refused a release update; carries its reason.
    #[error("{0}")]
    UpdateRejected(String),

    /// The bundle update itself reported error-level messages.
    #[error("{0}")]
    Update(String),

    /// The state store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for EngineFault {
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ENGINE_VALIDATION",
            Self::Conflict(_) => "ENGINE_CONFLICT",
            Self::NotFound(_) => "ENGINE_NOT_FOUND",
            Self::Artifact(e) => e.code(),
            Self::Extension(e) => e.code(),
            Self::UpdateRejected(_) => "ENGINE_UPDATE_REJECTED",
            Self::Update(_) => "ENGINE_UPDATE_FAILED",
            Self::Store(e) => e.code(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Conflict(_) | Self::NotFound(_) => false,
            Self::Artifact(e) => e.is_recoverable(),
            Self::Extension(e) => e.is_recoverable(),
            Self::UpdateRejected(_) => false,
            Self::Update(_) => true,
            Self::Store(e) => e.is_recoverable(),
        }
    }
}

impl EngineFault {
    /// Renders the fault as the failure message format of the envelope.
    #[must_use]
    pub fn render(&self) -> String {
        format!("{}: {}", self.code(), self)
    }

    /// Folds the fault into a failure envelope.
    #[must_use]
    pub fn into_response<T>(self) -> ServiceResponse<T> {
        ServiceResponse::failure(self.render())
    }

    /// Folds the fault into a failure envelope that still carries a payload,
    /// such as the existing resource behind a conflict.
    #[must_use]
    pub fn into_response_with<T>(self, payload: T) -> ServiceResponse<T> {
        ServiceResponse::failure_with(self.render(), payload)
    }
}
