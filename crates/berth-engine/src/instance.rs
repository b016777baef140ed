//! Live container instance.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use berth_extension::{ArtifactHandle, ArtifactScanner};
use berth_types::{ContainerResource, ContainerStatus, Coordinates};

/// Mutable state of a container, guarded by the per-instance mutex.
pub struct InstanceState {
    /// Public projection; `resource.status` is the authoritative status.
    pub resource: ContainerResource,
    /// Handle to the materialized bundle; `None` once disposed.
    pub artifact: Option<Arc<dyn ArtifactHandle>>,
    /// Version scanner slot; `None` until created and after disposal.
    pub scanner: Option<Box<dyn ArtifactScanner>>,
    codec_cache: HashMap<String, Vec<u8>>,
}

impl InstanceState {
    #[must_use]
    pub fn status(&self) -> ContainerStatus {
        self.resource.status
    }

    pub fn set_status(&mut self, status: ContainerStatus) {
        self.resource.status = status;
    }

    /// Memoizes an encoded representation for the transport layer.
    pub fn cache_codec(&mut self, key: impl Into<String>, encoded: Vec<u8>) {
        self.codec_cache.insert(key.into(), encoded);
    }

    #[must_use]
    pub fn cached_codec(&self, key: &str) -> Option<&[u8]> {
        self.codec_cache.get(key).map(Vec::as_slice)
    }

    /// Drops every memoized representation. Invoked before an in-place
    /// version upgrade so stale encodings never outlive the old bundle.
    pub fn clear_codec_caches(&mut self) {
        self.codec_cache.clear();
    }
}

/// One hosted container.
///
/// The registry owns the instance exclusively; everyone else holds cloned
/// `Arc`s. The single mutex over [`InstanceState`] is the per-instance lock:
/// create and dispose bodies and every scanner transition hold it for their
/// whole duration, while the release-update path takes only short reads.
pub struct ContainerInstance {
    container_id: String,
    state: Mutex<InstanceState>,
}

impl ContainerInstance {
    /// Creates an instance in `Creating` status for the requested
    /// coordinates.
    #[must_use]
    pub fn new(container_id: impl Into<String>, coordinates: Coordinates) -> Self {
        let container_id = container_id.into();
        let resource = ContainerResource::new(
            container_id.clone(),
            Some(coordinates),
            ContainerStatus::Creating,
        );
        Self {
            container_id,
            state: Mutex::new(InstanceState {
                resource,
                artifact: None,
                scanner: None,
                codec_cache: HashMap::new(),
            }),
        }
    }

    #[must_use]
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Acquires the per-instance lock.
    pub fn lock(&self) -> MutexGuard<'_, InstanceState> {
        self.state.lock()
    }

    /// Current status (short lock).
    #[must_use]
    pub fn status(&self) -> ContainerStatus {
        self.state.lock().status()
    }

    /// Snapshot of the public projection (short lock).
    #[must_use]
    pub fn resource(&self) -> ContainerResource {
        self.state.lock().resource.clone()
    }

    /// Clone of the artifact handle, if the container is materialized
    /// (short lock).
    #[must_use]
    pub fn artifact(&self) -> Option<Arc<dyn ArtifactHandle>> {
        self.state.lock().artifact.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_creating_with_requested_coordinates() {
        let instance = ContainerInstance::new("c1", Coordinates::new("g", "a", "1.0"));
        assert_eq!(instance.status(), ContainerStatus::Creating);

        let resource = instance.resource();
        assert_eq!(resource.container_id, "c1");
        assert_eq!(
            resource.coordinates.map(|c| c.to_string()),
            Some("g:a:1.0".into())
        );
        assert!(instance.artifact().is_none());
    }

    #[test]
    fn status_mirrors_resource() {
        let instance = ContainerInstance::new("c1", Coordinates::new("g", "a", "1.0"));
        instance.lock().set_status(ContainerStatus::Started);
        assert_eq!(instance.status(), ContainerStatus::Started);
        assert_eq!(instance.resource().status, ContainerStatus::Started);
    }

    #[test]
    fn codec_cache_clears() {
        let instance = ContainerInstance::new("c1", Coordinates::new("g", "a", "1.0"));
        {
            let mut state = instance.lock();
            state.cache_codec("json", vec![1, 2, 3]);
            assert_eq!(state.cached_codec("json"), Some(&[1u8, 2, 3][..]));
        }
        instance.lock().clear_codec_caches();
        assert!(instance.lock().cached_codec("json").is_none());
    }
}
