//! Container and scanner lifecycle statuses.
//!
//! # Container Lifecycle
//!
//! ```text
//! Creating → Started → Disposing → (removed)
//!     ↓         ↓
//!   Failed   Failed
//! ```
//!
//! # Scanner Lifecycle
//!
//! ```text
//! Created ⇄ Started ⇄ Scanning
//!     ↓        ↓
//!  Stopped → Disposed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a container.
///
/// | Status | Meaning |
/// |--------|---------|
/// | `Creating` | Registered, artifact not yet wired through extensions |
/// | `Started` | Fully installed and serving |
/// | `Disposing` | Teardown in progress |
/// | `Failed` | Creation failed; left registered for inspection/dispose |
/// | `Stopped` | Installed but not serving |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerStatus {
    Creating,
    Started,
    Disposing,
    Failed,
    Stopped,
}

impl ContainerStatus {
    /// Returns `true` if the container is serving requests.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Started)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Creating => write!(f, "creating"),
            Self::Started => write!(f, "started"),
            Self::Disposing => write!(f, "disposing"),
            Self::Failed => write!(f, "failed"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Status of a container's version scanner as exposed to callers.
///
/// The artifact runtime reports a finer-grained raw status; the engine folds
/// it into this set before it crosses the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScannerStatus {
    Created,
    Started,
    Stopped,
    Scanning,
    Disposed,
    Unknown,
}

impl ScannerStatus {
    /// Returns `true` while the scanner is polling or mid-scan.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Started | Self::Scanning)
    }
}

impl fmt::Display for ScannerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
            Self::Scanning => write!(f, "scanning"),
            Self::Disposed => write!(f, "disposed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_status_is_live() {
        assert!(ContainerStatus::Started.is_live());
        assert!(!ContainerStatus::Creating.is_live());
        assert!(!ContainerStatus::Failed.is_live());
    }

    #[test]
    fn scanner_status_is_running() {
        assert!(ScannerStatus::Started.is_running());
        assert!(ScannerStatus::Scanning.is_running());
        assert!(!ScannerStatus::Stopped.is_running());
        assert!(!ScannerStatus::Disposed.is_running());
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ContainerStatus::Disposing.to_string(), "disposing");
        assert_eq!(ScannerStatus::Scanning.to_string(), "scanning");
    }
}
