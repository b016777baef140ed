//! Public projections of containers and scanners.

use serde::{Deserialize, Serialize};

use crate::{ContainerStatus, Coordinates, Message, ScannerStatus};

/// Scanner state as exposed to callers.
///
/// `poll_interval_ms` is required when asking for a transition to
/// [`ScannerStatus::Started`] and reported back once the scanner runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerResource {
    pub status: ScannerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl ScannerResource {
    #[must_use]
    pub fn new(status: ScannerStatus) -> Self {
        Self {
            status,
            poll_interval_ms: None,
        }
    }

    #[must_use]
    pub fn with_interval(status: ScannerStatus, poll_interval_ms: u64) -> Self {
        Self {
            status,
            poll_interval_ms: Some(poll_interval_ms),
        }
    }
}

/// Public view of one container, both persisted and returned to callers.
///
/// `coordinates` are the requested triple; `resolved_coordinates` is what the
/// artifact runtime materialized, which differs when the version is moving.
/// `messages` are attached when the resource is read and are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerResource {
    pub container_id: String,
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_coordinates: Option<Coordinates>,
    pub status: ContainerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner: Option<ScannerResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl ContainerResource {
    /// Creates a resource carrying the requested coordinates.
    ///
    /// `coordinates` stays optional because creation requests arrive from a
    /// remote surface that may omit it; the engine validates presence.
    #[must_use]
    pub fn new(
        container_id: impl Into<String>,
        coordinates: Option<Coordinates>,
        status: ContainerStatus,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            coordinates,
            resolved_coordinates: None,
            status,
            scanner: None,
            messages: Vec::new(),
        }
    }

    /// Reduces to the persisted projection: id, coordinates, resolved
    /// coordinates, and status. Messages and scanner state are runtime-only.
    #[must_use]
    pub fn persistent(&self) -> Self {
        let mut copy = self.clone();
        copy.messages = Vec::new();
        copy.scanner = None;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistent_copy_drops_messages() {
        let mut resource = ContainerResource::new(
            "c1",
            Some(Coordinates::new("g", "a", "1.0")),
            ContainerStatus::Started,
        );
        resource.messages.push(Message::info("installed"));
        resource.scanner = Some(ScannerResource::new(ScannerStatus::Stopped));

        let stored = resource.persistent();
        assert!(stored.messages.is_empty());
        assert!(stored.scanner.is_none());
        assert_eq!(stored.container_id, "c1");
        assert_eq!(stored.status, ContainerStatus::Started);
    }

    #[test]
    fn scanner_resource_interval() {
        let scanner = ScannerResource::with_interval(ScannerStatus::Started, 1000);
        assert_eq!(scanner.poll_interval_ms, Some(1000));
        assert!(ScannerResource::new(ScannerStatus::Stopped)
            .poll_interval_ms
            .is_none());
    }
}
