//! Deterministic test doubles.
//!
//! Engine tests run without a real artifact runtime, controller, or disk:
//! a recording extension that logs every callback into a shared list, a
//! stub artifact runtime whose handles can be scripted to fail, a scripted
//! controller that replays a fixed handshake sequence, and an in-memory
//! state store.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use berth_engine::testing::{call_log, RecordingExtension};
//! use berth_engine::ExtensionRegistry;
//!
//! let log = call_log();
//! let registry = ExtensionRegistry::new(vec![
//!     Arc::new(RecordingExtension::new("rules", 1, log.clone())),
//!     Arc::new(RecordingExtension::new("process", 2, log.clone())),
//! ]);
//! assert_eq!(registry.capabilities(), vec!["RULES", "PROCESS"]);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use berth_extension::{
    ArtifactError, ArtifactHandle, ArtifactRuntime, ArtifactScanner, Extension, ExtensionError,
    ExtensionParams, HostContext, RawScannerStatus, UpdateOutcome,
};
use berth_types::{Coordinates, ServerInfo, ServerState};

use crate::controller::{ControllerClient, ControllerConnection};
use crate::store::{StateStore, StoreError};

/// Shared callback log; entries read `operation:extension:container`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Fresh shared log for a set of [`RecordingExtension`]s.
#[must_use]
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Extension double that records every callback and can be armed to fail or
/// veto specific operations.
pub struct RecordingExtension {
    name: String,
    capability: String,
    order: i32,
    active: bool,
    fail_init: bool,
    fail_create: bool,
    fail_dispose: bool,
    fail_update: bool,
    veto_reason: Option<String>,
    calls: CallLog,
}

impl RecordingExtension {
    /// Capability defaults to the upper-cased name.
    #[must_use]
    pub fn new(name: &str, order: i32, calls: CallLog) -> Self {
        Self {
            name: name.to_string(),
            capability: name.to_uppercase(),
            order,
            active: true,
            fail_init: false,
            fail_create: false,
            fail_dispose: false,
            fail_update: false,
            veto_reason: None,
            calls,
        }
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    #[must_use]
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    #[must_use]
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    #[must_use]
    pub fn failing_dispose(mut self) -> Self {
        self.fail_dispose = true;
        self
    }

    #[must_use]
    pub fn failing_update(mut self) -> Self {
        self.fail_update = true;
        self
    }

    #[must_use]
    pub fn vetoing_update(mut self, reason: &str) -> Self {
        self.veto_reason = Some(reason.to_string());
        self
    }

    fn record(&self, operation: &str, container_id: &str) {
        self.calls
            .lock()
            .push(format!("{operation}:{}:{container_id}", self.name));
    }
}

impl Extension for RecordingExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn start_order(&self) -> i32 {
        self.order
    }

    fn implemented_capability(&self) -> &str {
        &self.capability
    }

    fn init(&self, _ctx: &HostContext) -> Result<(), ExtensionError> {
        self.record("init", "-");
        if self.fail_init {
            return Err(ExtensionError::Init(format!("{} refused init", self.name)));
        }
        Ok(())
    }

    fn destroy(&self, _ctx: &HostContext) -> Result<(), ExtensionError> {
        self.record("destroy", "-");
        Ok(())
    }

    fn create_container(
        &self,
        container_id: &str,
        _artifact: &dyn ArtifactHandle,
        _params: &mut ExtensionParams,
    ) -> Result<(), ExtensionError> {
        self.record("create", container_id);
        if self.fail_create {
            return Err(ExtensionError::CreateContainer(format!(
                "{} refused create",
                self.name
            )));
        }
        Ok(())
    }

    fn dispose_container(
        &self,
        container_id: &str,
        _artifact: &dyn ArtifactHandle,
        _params: &mut ExtensionParams,
    ) -> Result<(), ExtensionError> {
        self.record("dispose", container_id);
        if self.fail_dispose {
            return Err(ExtensionError::DisposeContainer(format!(
                "{} refused dispose",
                self.name
            )));
        }
        Ok(())
    }

    fn update_container(
        &self,
        container_id: &str,
        _artifact: &dyn ArtifactHandle,
        _params: &mut ExtensionParams,
    ) -> Result<(), ExtensionError> {
        self.record("update", container_id);
        if self.fail_update {
            return Err(ExtensionError::UpdateContainer(format!(
                "{} refused update",
                self.name
            )));
        }
        Ok(())
    }

    fn is_update_allowed(
        &self,
        container_id: &str,
        _artifact: &dyn ArtifactHandle,
        params: &mut ExtensionParams,
    ) -> bool {
        self.record("check", container_id);
        if let Some(reason) = &self.veto_reason {
            params.set_failure_reason(reason.clone());
            return false;
        }
        true
    }
}

/// Scanner double driven purely by the engine's state machine.
pub struct StubScanner {
    status: Mutex<RawScannerStatus>,
    interval: Mutex<Option<u64>>,
}

impl StubScanner {
    /// Fresh scanners report `Stopped`, matching a runtime scanner after
    /// construction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: Mutex::new(RawScannerStatus::Stopped),
            interval: Mutex::new(None),
        }
    }
}

impl Default for StubScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactScanner for StubScanner {
    fn status(&self) -> RawScannerStatus {
        *self.status.lock()
    }

    fn poll_interval_ms(&self) -> Option<u64> {
        *self.interval.lock()
    }

    fn start(&self, poll_interval_ms: u64) {
        *self.status.lock() = RawScannerStatus::Running;
        *self.interval.lock() = Some(poll_interval_ms);
    }

    fn stop(&self) {
        *self.status.lock() = RawScannerStatus::Stopped;
    }

    fn scan_now(&self) {
        // a real scanner passes through Scanning and returns; the stub's
        // observable state is unchanged
    }

    fn shutdown(&self) {
        *self.status.lock() = RawScannerStatus::Shutdown;
    }
}

/// Artifact handle double with scriptable update failures.
pub struct StubArtifactHandle {
    resolved: Mutex<Coordinates>,
    disposed: AtomicBool,
    update_errors: Mutex<Option<Vec<String>>>,
}

impl StubArtifactHandle {
    #[must_use]
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            resolved: Mutex::new(coordinates),
            disposed: AtomicBool::new(false),
            update_errors: Mutex::new(None),
        }
    }

    /// Arms the next `update_to_version` to fail with these error texts.
    pub fn fail_next_update(&self, errors: Vec<String>) {
        *self.update_errors.lock() = Some(errors);
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl ArtifactHandle for StubArtifactHandle {
    fn resolved_coordinates(&self) -> Coordinates {
        self.resolved.lock().clone()
    }

    fn update_to_version(&self, target: &Coordinates) -> UpdateOutcome {
        if let Some(errors) = self.update_errors.lock().take() {
            return UpdateOutcome::with_errors(errors);
        }
        *self.resolved.lock() = target.clone();
        UpdateOutcome::clean()
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    fn new_scanner(&self) -> Result<Box<dyn ArtifactScanner>, ArtifactError> {
        Ok(Box::new(StubScanner::new()))
    }
}

/// Artifact runtime double; resolution can be toggled to fail and the last
/// materialized handle stays reachable for assertions.
#[derive(Default)]
pub struct StubArtifactRuntime {
    fail_resolution: AtomicBool,
    last_handle: Mutex<Option<Arc<StubArtifactHandle>>>,
}

impl StubArtifactRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_resolution(&self, fail: bool) {
        self.fail_resolution.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn last_handle(&self) -> Option<Arc<StubArtifactHandle>> {
        self.last_handle.lock().clone()
    }
}

impl ArtifactRuntime for StubArtifactRuntime {
    fn resolve(&self, coordinates: &Coordinates) -> Result<Arc<dyn ArtifactHandle>, ArtifactError> {
        if self.fail_resolution.load(Ordering::SeqCst) {
            return Err(ArtifactError::Resolution(format!(
                "no artifact for {coordinates}"
            )));
        }
        let handle = Arc::new(StubArtifactHandle::new(coordinates.clone()));
        *self.last_handle.lock() = Some(Arc::clone(&handle));
        Ok(handle)
    }

    fn module_metadata(&self, coordinates: &Coordinates) -> serde_json::Value {
        json!({ "coordinates": coordinates.to_string() })
    }
}

/// Controller double replaying a scripted handshake sequence, then a fixed
/// fallback.
pub struct ScriptedController {
    script: Mutex<VecDeque<ControllerConnection>>,
    fallback: ControllerConnection,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
}

impl ScriptedController {
    /// Always answers `NotDefined`, the wiring for a controller-less host.
    #[must_use]
    pub fn not_defined() -> Self {
        Self::with_script(Vec::new(), ControllerConnection::NotDefined)
    }

    /// Always answers `NotConnected`, an unreachable control plane.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::with_script(Vec::new(), ControllerConnection::NotConnected)
    }

    #[must_use]
    pub fn with_script(script: Vec<ControllerConnection>, fallback: ControllerConnection) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl ControllerClient for ScriptedController {
    fn connect(&self, _info: &ServerInfo) -> ControllerConnection {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn disconnect(&self, _info: &ServerInfo) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// State store double keeping documents in a map.
#[derive(Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<String, ServerState>>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read of a stored document for assertions.
    #[must_use]
    pub fn snapshot(&self, server_id: &str) -> Option<ServerState> {
        self.states.lock().get(server_id).cloned()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, server_id: &str) -> Result<ServerState, StoreError> {
        Ok(self
            .states
            .lock()
            .get(server_id)
            .cloned()
            .unwrap_or_else(|| ServerState::new(server_id)))
    }

    fn store(&self, server_id: &str, state: &ServerState) -> Result<(), StoreError> {
        self.states.lock().insert(server_id.to_string(), state.clone());
        Ok(())
    }
}
