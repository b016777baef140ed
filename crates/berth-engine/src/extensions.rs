//! Ordered extension registry.

use std::sync::Arc;

use tracing::debug;

use berth_extension::Extension;

/// The active extensions of this host, in fan-out order.
///
/// Built once at startup from a static registration table (a dynamic
/// discovery mechanism would feed the same constructor). Inactive extensions
/// are dropped; the rest are sorted by ascending
/// [`start_order`](Extension::start_order) with ties keeping their
/// registration order. This order drives init, create, update, and dispose
/// fan-outs; rollback walks the completed prefix in reverse.
pub struct ExtensionRegistry {
    ordered: Vec<Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    #[must_use]
    pub fn new(extensions: Vec<Arc<dyn Extension>>) -> Self {
        let mut ordered: Vec<_> = extensions
            .into_iter()
            .filter(|ext| {
                let active = ext.is_active();
                if !active {
                    debug!(extension = ext.name(), "skipping inactive extension");
                }
                active
            })
            .collect();
        ordered.sort_by_key(|ext| ext.start_order());
        Self { ordered }
    }

    /// Iterates extensions in start order.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<dyn Extension>> {
        self.ordered.iter()
    }

    /// Capability strings of every active extension, in start order.
    #[must_use]
    pub fn capabilities(&self) -> Vec<String> {
        self.ordered
            .iter()
            .map(|ext| ext.implemented_capability().to_string())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{call_log, RecordingExtension};

    #[test]
    fn sorted_by_start_order() {
        let log = call_log();
        let registry = ExtensionRegistry::new(vec![
            Arc::new(RecordingExtension::new("late", 10, log.clone())),
            Arc::new(RecordingExtension::new("early", 1, log.clone())),
            Arc::new(RecordingExtension::new("middle", 5, log)),
        ]);

        let names: Vec<_> = registry.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["early", "middle", "late"]);
    }

    #[test]
    fn ties_keep_registration_order() {
        let log = call_log();
        let registry = ExtensionRegistry::new(vec![
            Arc::new(RecordingExtension::new("first", 3, log.clone())),
            Arc::new(RecordingExtension::new("second", 3, log)),
        ]);

        let names: Vec<_> = registry.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn inactive_extensions_are_dropped() {
        let log = call_log();
        let registry = ExtensionRegistry::new(vec![
            Arc::new(RecordingExtension::new("on", 1, log.clone())),
            Arc::new(RecordingExtension::new("off", 2, log).inactive()),
        ]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.capabilities(), vec!["ON"]);
    }
}
