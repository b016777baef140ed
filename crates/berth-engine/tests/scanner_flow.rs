//! Scanner substate machine scenarios.

use std::sync::Arc;

use berth_engine::testing::{MemoryStateStore, ScriptedController, StubArtifactRuntime};
use berth_engine::{ControllerClient, EngineConfig, HostEngine, StateStore};
use berth_types::{
    ContainerResource, ContainerStatus, Coordinates, ScannerResource, ScannerStatus, Severity,
};

fn engine_with_container(container_id: &str) -> Arc<HostEngine> {
    let engine = HostEngine::bootstrap(
        EngineConfig::new("srv-scan"),
        Arc::new(MemoryStateStore::new()) as Arc<dyn StateStore>,
        Arc::new(StubArtifactRuntime::new()) as Arc<dyn berth_extension::ArtifactRuntime>,
        Vec::new(),
        Arc::new(ScriptedController::not_defined()) as Arc<dyn ControllerClient>,
    )
    .expect("bootstrap");
    let created = engine.create_container(
        container_id,
        ContainerResource::new(
            container_id,
            Some(Coordinates::new("org.example", "demo", "1.0.0-SNAPSHOT")),
            ContainerStatus::Started,
        ),
    );
    assert!(created.is_success(), "{}", created.message);
    engine
}

fn target(status: ScannerStatus) -> ScannerResource {
    ScannerResource::new(status)
}

#[test]
fn full_walk_created_started_scanning_stopped_disposed() {
    let engine = engine_with_container("c1");

    let created = engine.update_scanner("c1", target(ScannerStatus::Created));
    assert!(created.is_success(), "{}", created.message);

    let started =
        engine.update_scanner("c1", ScannerResource::with_interval(ScannerStatus::Started, 1000));
    assert!(started.is_success(), "{}", started.message);
    let payload = started.payload.expect("scanner resource");
    assert_eq!(payload.status, ScannerStatus::Started);
    assert_eq!(payload.poll_interval_ms, Some(1000));

    let scanning = engine.update_scanner("c1", target(ScannerStatus::Scanning));
    assert!(scanning.is_success(), "{}", scanning.message);

    let stopped = engine.update_scanner("c1", target(ScannerStatus::Stopped));
    assert!(stopped.is_success(), "{}", stopped.message);
    assert_eq!(
        stopped.payload.expect("scanner resource").status,
        ScannerStatus::Stopped
    );

    let disposed = engine.update_scanner("c1", target(ScannerStatus::Disposed));
    assert!(disposed.is_success(), "{}", disposed.message);

    // the slot is empty again, which reads as disposed
    let info = engine.get_scanner_info("c1").payload.expect("scanner info");
    assert_eq!(info.status, ScannerStatus::Disposed);
}

#[test]
fn create_twice_fails_with_already_exists() {
    let engine = engine_with_container("c1");
    assert!(engine
        .update_scanner("c1", target(ScannerStatus::Created))
        .is_success());

    let second = engine.update_scanner("c1", target(ScannerStatus::Created));
    assert!(second.is_failure());
    assert!(second.message.contains("already exists"));
}

#[test]
fn start_requires_poll_interval() {
    let engine = engine_with_container("c1");

    let response = engine.update_scanner("c1", target(ScannerStatus::Started));
    assert!(response.is_failure());
    assert!(response.message.contains("invalid polling interval"));

    // zero is not a valid interval either
    let response =
        engine.update_scanner("c1", ScannerResource::with_interval(ScannerStatus::Started, 0));
    assert!(response.is_failure());
}

#[test]
fn start_while_running_fails_and_does_not_mutate() {
    let engine = engine_with_container("c1");
    engine.update_scanner("c1", ScannerResource::with_interval(ScannerStatus::Started, 1000));

    let again =
        engine.update_scanner("c1", ScannerResource::with_interval(ScannerStatus::Started, 5000));
    assert!(again.is_failure());
    assert!(again.message.contains("invalid scanner status"));

    let info = engine.get_scanner_info("c1").payload.expect("scanner info");
    assert_eq!(info.status, ScannerStatus::Started);
    assert_eq!(info.poll_interval_ms, Some(1000));
}

#[test]
fn stop_without_scanner_fails() {
    let engine = engine_with_container("c1");

    let response = engine.update_scanner("c1", target(ScannerStatus::Stopped));
    assert!(response.is_failure());
    assert!(response.message.contains("not instantiated"));
}

#[test]
fn stop_when_stopped_fails() {
    let engine = engine_with_container("c1");
    engine.update_scanner("c1", target(ScannerStatus::Created));

    let response = engine.update_scanner("c1", target(ScannerStatus::Stopped));
    assert!(response.is_failure());
    assert!(response.message.contains("invalid scanner status"));
}

#[test]
fn scanning_auto_creates_scanner() {
    let engine = engine_with_container("c1");

    let response = engine.update_scanner("c1", target(ScannerStatus::Scanning));
    assert!(response.is_success(), "{}", response.message);

    // the scanner now exists: a second create conflicts
    let created = engine.update_scanner("c1", target(ScannerStatus::Created));
    assert!(created.is_failure());
}

#[test]
fn dispose_without_scanner_succeeds() {
    let engine = engine_with_container("c1");

    let response = engine.update_scanner("c1", target(ScannerStatus::Disposed));
    assert!(response.is_success());
    assert!(response.message.contains("already disposed"));
}

#[test]
fn dispose_stops_running_scanner_first() {
    let engine = engine_with_container("c1");
    engine.update_scanner("c1", ScannerResource::with_interval(ScannerStatus::Started, 1000));

    let response = engine.update_scanner("c1", target(ScannerStatus::Disposed));
    assert!(response.is_success(), "{}", response.message);
    assert_eq!(
        engine
            .get_scanner_info("c1")
            .payload
            .expect("scanner info")
            .status,
        ScannerStatus::Disposed
    );
}

#[test]
fn unknown_container_fails_scanner_operations() {
    let engine = engine_with_container("c1");

    assert!(engine
        .update_scanner("ghost", target(ScannerStatus::Created))
        .is_failure());
    assert!(engine.get_scanner_info("ghost").is_failure());
}

#[test]
fn unknown_target_status_is_rejected() {
    let engine = engine_with_container("c1");

    let response = engine.update_scanner("c1", target(ScannerStatus::Unknown));
    assert!(response.is_failure());
    assert!(response.message.contains("unknown scanner status"));
}

#[test]
fn each_transition_replaces_the_message_log() {
    let engine = engine_with_container("c1");

    engine.update_scanner("c1", target(ScannerStatus::Created));
    engine.update_scanner("c1", ScannerResource::with_interval(ScannerStatus::Started, 1000));

    let info = engine.get_container_info("c1").payload.expect("info");
    let infos: Vec<_> = info
        .messages
        .iter()
        .filter(|m| m.severity == Severity::Info)
        .collect();
    assert_eq!(infos.len(), 1, "previous transition messages are cleared");
    assert!(infos[0].text.contains("successfully started"));
}

#[test]
fn container_info_reports_scanner_state() {
    let engine = engine_with_container("c1");
    engine.update_scanner("c1", ScannerResource::with_interval(ScannerStatus::Started, 2000));

    let info = engine.get_container_info("c1").payload.expect("info");
    let scanner = info.scanner.expect("scanner attached");
    assert_eq!(scanner.status, ScannerStatus::Started);
    assert_eq!(scanner.poll_interval_ms, Some(2000));
}
