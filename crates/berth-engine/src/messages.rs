//! Server-wide and per-container message logs.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use berth_types::Message;

/// The two diagnostic logs of the host.
///
/// The server-wide list only ever grows. Per-container lists are replaced at
/// the start of scanner and release-update operations; readers take cheap
/// snapshots, so a reader never observes a list mid-mutation.
#[derive(Default)]
pub struct MessageLogs {
    server: Mutex<Vec<Message>>,
    containers: RwLock<HashMap<String, Arc<RwLock<Vec<Message>>>>>,
}

impl MessageLogs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server_append(&self, message: Message) {
        self.server.lock().push(message);
    }

    #[must_use]
    pub fn server_snapshot(&self) -> Vec<Message> {
        self.server.lock().clone()
    }

    fn bucket(&self, container_id: &str) -> Arc<RwLock<Vec<Message>>> {
        if let Some(bucket) = self.containers.read().get(container_id) {
            return Arc::clone(bucket);
        }
        let mut map = self.containers.write();
        Arc::clone(
            map.entry(container_id.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(Vec::new()))),
        )
    }

    pub fn append(&self, container_id: &str, message: Message) {
        self.bucket(container_id).write().push(message);
    }

    /// Replaces the container's whole log. Create and dispose collect their
    /// trail locally and swap it in once, so the trail survives success and
    /// failure paths alike.
    pub fn replace(&self, container_id: &str, messages: Vec<Message>) {
        *self.bucket(container_id).write() = messages;
    }

    /// Empties the container's log; every scanner and release-update
    /// operation starts this way.
    pub fn clear(&self, container_id: &str) {
        self.bucket(container_id).write().clear();
    }

    #[must_use]
    pub fn snapshot(&self, container_id: &str) -> Vec<Message> {
        self.bucket(container_id).read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_types::Severity;

    #[test]
    fn server_log_appends() {
        let logs = MessageLogs::new();
        logs.server_append(Message::info("started"));
        logs.server_append(Message::error("extension failed"));

        let snapshot = logs.server_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].severity, Severity::Error);
    }

    #[test]
    fn container_logs_are_independent() {
        let logs = MessageLogs::new();
        logs.append("c1", Message::info("one"));
        logs.append("c2", Message::info("two"));
        logs.clear("c1");

        assert!(logs.snapshot("c1").is_empty());
        assert_eq!(logs.snapshot("c2").len(), 1);
    }

    #[test]
    fn replace_swaps_whole_list() {
        let logs = MessageLogs::new();
        logs.append("c1", Message::info("stale"));
        logs.replace("c1", vec![Message::info("fresh"), Message::warn("careful")]);

        let snapshot = logs.snapshot("c1");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].text, "fresh");
    }

    #[test]
    fn unknown_container_snapshot_is_empty() {
        let logs = MessageLogs::new();
        assert!(logs.snapshot("missing").is_empty());
    }
}
