//! Persisted server state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ContainerResource;

/// The authoritative server document persisted by the state store.
///
/// `containers` behaves as a set keyed by `container_id`; the mutating
/// helpers below enforce that invariant so callers never insert duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerState {
    pub server_id: String,
    #[serde(default)]
    pub controllers: Vec<String>,
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
    #[serde(default)]
    pub containers: Vec<ContainerResource>,
}

impl ServerState {
    /// Fresh empty state for a server id, which is also what the store hands
    /// out for an unknown id.
    #[must_use]
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            controllers: Vec::new(),
            configuration: BTreeMap::new(),
            containers: Vec::new(),
        }
    }

    /// Looks up a container by id.
    #[must_use]
    pub fn container(&self, container_id: &str) -> Option<&ContainerResource> {
        self.containers
            .iter()
            .find(|c| c.container_id == container_id)
    }

    /// Inserts or replaces the container with the same id.
    pub fn set_container(&mut self, resource: ContainerResource) {
        match self
            .containers
            .iter_mut()
            .find(|c| c.container_id == resource.container_id)
        {
            Some(existing) => *existing = resource,
            None => self.containers.push(resource),
        }
    }

    /// Removes and returns the container with the given id.
    pub fn remove_container(&mut self, container_id: &str) -> Option<ContainerResource> {
        let index = self
            .containers
            .iter()
            .position(|c| c.container_id == container_id)?;
        Some(self.containers.remove(index))
    }

    /// Returns a configuration value.
    #[must_use]
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }

    /// Reads a configuration value as a boolean flag; anything other than a
    /// case-insensitive `true` is `false`.
    #[must_use]
    pub fn config_flag(&self, key: &str) -> bool {
        self.config_value(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}
