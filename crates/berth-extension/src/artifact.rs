//! Artifact runtime seam.
//!
//! The engine never materializes bundles itself; it talks to an
//! [`ArtifactRuntime`] that resolves coordinates into live
//! [`ArtifactHandle`]s, and each handle can spawn the [`ArtifactScanner`]
//! that polls for newer versions of a moving coordinate.

use std::sync::Arc;

use thiserror::Error;

use berth_types::{Coordinates, ErrorCode, Message, Severity};

/// Errors raised at the artifact seam.
#[derive(Debug, Clone, Error)]
pub enum ArtifactError {
    /// The bundle could not be materialized from its coordinates.
    #[error("artifact resolution failed: {0}")]
    Resolution(String),

    /// The runtime could not provide a scanner for the bundle.
    #[error("scanner unavailable: {0}")]
    Scanner(String),
}

impl ErrorCode for ArtifactError {
    fn code(&self) -> &'static str {
        match self {
            Self::Resolution(_) => "ARTIFACT_RESOLUTION_FAILED",
            Self::Scanner(_) => "ARTIFACT_SCANNER_UNAVAILABLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Repositories come and go; retrying either operation can succeed.
        true
    }
}

/// Raw scanner status as reported by the artifact runtime.
///
/// The engine maps this onto the exposed
/// [`ScannerStatus`](berth_types::ScannerStatus) before it leaves the host:
///
/// | Raw | Exposed |
/// |-----|---------|
/// | `Starting` | `Created` |
/// | `Running` | `Started` |
/// | `Scanning`, `Updating` | `Scanning` |
/// | `Stopped` | `Stopped` |
/// | `Shutdown` | `Disposed` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawScannerStatus {
    Starting,
    Running,
    Scanning,
    Updating,
    Stopped,
    Shutdown,
}

/// Result of an in-place version upgrade of a bundle.
///
/// Carries the build messages produced while swapping versions; any
/// error-level message means the upgrade did not cleanly apply.
#[derive(Debug, Clone, Default)]
pub struct UpdateOutcome {
    pub messages: Vec<Message>,
}

impl UpdateOutcome {
    /// An upgrade that produced no messages at all.
    #[must_use]
    pub fn clean() -> Self {
        Self::default()
    }

    /// An upgrade that failed with the given error texts.
    #[must_use]
    pub fn with_errors(errors: Vec<String>) -> Self {
        Self {
            messages: errors.into_iter().map(Message::error).collect(),
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.severity == Severity::Error)
    }

    /// Texts of the error-level messages, in order.
    #[must_use]
    pub fn error_texts(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .map(|m| m.text.clone())
            .collect()
    }
}

/// Background poller bound to one container's bundle.
///
/// Supplied by the artifact runtime; the engine only drives the state
/// machine and maps statuses. Implementations manage their own threads and
/// must tolerate calls from any thread.
pub trait ArtifactScanner: Send + Sync {
    fn status(&self) -> RawScannerStatus;

    /// Last configured poll interval, if any.
    fn poll_interval_ms(&self) -> Option<u64>;

    /// Starts periodic polling.
    fn start(&self, poll_interval_ms: u64);

    /// Stops periodic polling; the scanner stays usable.
    fn stop(&self);

    /// Triggers one immediate scan.
    fn scan_now(&self);

    /// Permanently shuts the scanner down.
    fn shutdown(&self);
}

/// Live handle to one materialized bundle.
pub trait ArtifactHandle: Send + Sync {
    /// Concrete coordinates this handle currently runs, which differ from
    /// the requested ones when the version was moving.
    fn resolved_coordinates(&self) -> Coordinates;

    /// Swaps the bundle to another version in place.
    fn update_to_version(&self, target: &Coordinates) -> UpdateOutcome;

    /// Releases the materialized bundle.
    fn dispose(&self);

    /// Creates a scanner bound to this bundle.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Scanner`] when the runtime cannot poll this
    /// bundle, for example when its version is not moving.
    fn new_scanner(&self) -> Result<Box<dyn ArtifactScanner>, ArtifactError>;
}

/// Resolver that materializes bundles from coordinates.
pub trait ArtifactRuntime: Send + Sync {
    /// Materializes the bundle identified by `coordinates`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Resolution`] when the bundle cannot be
    /// found or loaded; the engine leaves the container registered as
    /// failed in that case.
    fn resolve(&self, coordinates: &Coordinates) -> Result<Arc<dyn ArtifactHandle>, ArtifactError>;

    /// Opaque module metadata passed to extensions alongside create and
    /// update fan-outs.
    fn module_metadata(&self, _coordinates: &Coordinates) -> serde_json::Value {
        serde_json::Value::Null
    }
}
