//! In-memory container registry.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::instance::ContainerInstance;

/// Concurrent mapping of container id to instance.
///
/// The registry is the single owner of every [`ContainerInstance`].
/// `register` is a compare-and-set: an existing mapping is returned without
/// being overwritten. No suspension point ever runs while the internal map
/// lock is held; callers receive cloned `Arc`s and lock instances afterwards.
#[derive(Default)]
pub struct ContainerRegistry {
    containers: RwLock<HashMap<String, Arc<ContainerInstance>>>,
}

impl ContainerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance under its container id unless one is already
    /// present, in which case the existing instance is returned untouched.
    pub fn register(&self, instance: Arc<ContainerInstance>) -> Option<Arc<ContainerInstance>> {
        let mut map = self.containers.write();
        match map.entry(instance.container_id().to_string()) {
            Entry::Occupied(existing) => Some(Arc::clone(existing.get())),
            Entry::Vacant(slot) => {
                slot.insert(instance);
                None
            }
        }
    }

    /// Atomically removes and returns the instance for an id.
    pub fn unregister(&self, container_id: &str) -> Option<Arc<ContainerInstance>> {
        self.containers.write().remove(container_id)
    }

    #[must_use]
    pub fn get(&self, container_id: &str) -> Option<Arc<ContainerInstance>> {
        self.containers.read().get(container_id).map(Arc::clone)
    }

    /// Snapshot of all registered instances, safe to traverse while other
    /// threads mutate the registry.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<ContainerInstance>> {
        self.containers.read().values().map(Arc::clone).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.read().is_empty()
    }
}
