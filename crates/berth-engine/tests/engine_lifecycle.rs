//! Container lifecycle scenarios over the public engine API.

use std::sync::Arc;

use berth_engine::testing::{
    call_log, CallLog, MemoryStateStore, RecordingExtension, ScriptedController,
    StubArtifactRuntime,
};
use berth_engine::{ControllerClient, EngineConfig, HostEngine, StateStore};
use berth_extension::Extension;
use berth_types::{ContainerResource, ContainerStatus, Coordinates, Severity};

fn coords(version: &str) -> Coordinates {
    Coordinates::new("org.example", "demo", version)
}

fn request(container_id: &str, version: &str) -> ContainerResource {
    ContainerResource::new(container_id, Some(coords(version)), ContainerStatus::Started)
}

fn engine_with(
    extensions: Vec<Arc<dyn Extension>>,
    store: Arc<MemoryStateStore>,
) -> (Arc<HostEngine>, Arc<StubArtifactRuntime>) {
    let artifacts = Arc::new(StubArtifactRuntime::new());
    let engine = HostEngine::bootstrap(
        EngineConfig::new("srv-test"),
        Arc::clone(&store) as Arc<dyn StateStore>,
        Arc::clone(&artifacts) as Arc<dyn berth_extension::ArtifactRuntime>,
        extensions,
        Arc::new(ScriptedController::not_defined()) as Arc<dyn ControllerClient>,
    )
    .expect("bootstrap");
    (engine, artifacts)
}

fn fresh_engine(
    extensions: Vec<Arc<dyn Extension>>,
) -> (Arc<HostEngine>, Arc<MemoryStateStore>, Arc<StubArtifactRuntime>) {
    let store = Arc::new(MemoryStateStore::new());
    let (engine, artifacts) = engine_with(extensions, Arc::clone(&store));
    (engine, store, artifacts)
}

fn ordered_extensions(log: &CallLog) -> Vec<Arc<dyn Extension>> {
    vec![
        Arc::new(RecordingExtension::new("alpha", 1, log.clone())),
        Arc::new(RecordingExtension::new("beta", 2, log.clone())),
        Arc::new(RecordingExtension::new("gamma", 3, log.clone())),
    ]
}

fn entries_with_prefix(log: &CallLog, prefix: &str) -> Vec<String> {
    log.lock()
        .iter()
        .filter(|entry| entry.starts_with(prefix))
        .cloned()
        .collect()
}

#[test]
fn create_then_list_shows_started_container() {
    let (engine, _store, _artifacts) = fresh_engine(Vec::new());

    let response = engine.create_container("c1", request("c1", "1.0.0"));
    assert!(response.is_success(), "{}", response.message);
    let resource = response.payload.expect("created resource");
    assert_eq!(resource.status, ContainerStatus::Started);
    assert_eq!(resource.resolved_coordinates, Some(coords("1.0.0")));

    let listed = engine.list_containers().payload.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].container_id, "c1");

    let state = engine.get_server_state().payload.expect("state");
    assert!(state.container("c1").is_some());
}

#[test]
fn duplicate_create_fails_with_existing_resource() {
    let (engine, _store, _artifacts) = fresh_engine(Vec::new());

    let first = engine.create_container("c1", request("c1", "1.0.0"));
    assert!(first.is_success());

    let second = engine.create_container("c1", request("c1", "2.0.0"));
    assert!(second.is_failure());
    assert!(second.message.contains("already exists"));
    assert_eq!(second.payload, first.payload);
}

#[test]
fn create_without_coordinates_is_rejected() {
    let (engine, _store, _artifacts) = fresh_engine(Vec::new());

    let response = engine.create_container(
        "c1",
        ContainerResource::new("c1", None, ContainerStatus::Started),
    );
    assert!(response.is_failure());
    assert!(response.message.contains("coordinates missing"));
    assert!(engine.list_containers().payload.expect("list").is_empty());
}

#[test]
fn resolution_failure_leaves_container_failed() {
    let (engine, store, artifacts) = fresh_engine(Vec::new());
    artifacts.fail_resolution(true);

    let response = engine.create_container("c1", request("c1", "1.0.0"));
    assert!(response.is_failure());
    assert!(response.message.contains("ARTIFACT_RESOLUTION_FAILED"));

    let info = engine.get_container_info("c1").payload.expect("info");
    assert_eq!(info.status, ContainerStatus::Failed);
    let persisted = store.snapshot("srv-test");
    assert!(persisted.map_or(true, |state| state.container("c1").is_none()));
}

#[test]
fn update_release_swaps_coordinates_and_persists() {
    let (engine, store, _artifacts) = fresh_engine(Vec::new());
    engine.create_container("c1", request("c1", "1.0.0"));

    let response = engine.update_container_release("c1", coords("2.0.0"));
    assert!(response.is_success(), "{}", response.message);
    assert_eq!(response.payload, Some(coords("2.0.0")));

    let release = engine.get_container_release("c1").payload.expect("release");
    assert_eq!(release, coords("2.0.0"));

    let persisted = store.snapshot("srv-test").expect("state");
    let container = persisted.container("c1").expect("c1");
    assert_eq!(container.coordinates, Some(coords("2.0.0")));
    assert_eq!(container.resolved_coordinates, Some(coords("2.0.0")));
}

#[test]
fn update_of_unknown_container_falls_through_to_create() {
    let (engine, _store, _artifacts) = fresh_engine(Vec::new());

    let response = engine.update_container_release("c9", coords("1.0.0"));
    assert!(response.is_success(), "{}", response.message);

    let info = engine.get_container_info("c9").payload.expect("info");
    assert_eq!(info.status, ContainerStatus::Started);
}

#[test]
fn update_veto_surfaces_extension_reason() {
    let log = call_log();
    let vetoing = RecordingExtension::new("process", 1, log.clone())
        .vetoing_update("active process instances");
    let (engine, store, _artifacts) = fresh_engine(vec![Arc::new(vetoing)]);
    engine.create_container("c1", request("c1", "1.0.0"));

    let response = engine.update_container_release("c1", coords("2.0.0"));
    assert!(response.is_failure());
    assert!(response.message.contains("active process instances"));

    // the veto happened before any write
    assert!(entries_with_prefix(&log, "update:").is_empty());
    let persisted = store.snapshot("srv-test").expect("state");
    assert_eq!(
        persisted.container("c1").expect("c1").coordinates,
        Some(coords("1.0.0"))
    );
}

#[test]
fn update_with_build_errors_reports_previous_coordinates() {
    let (engine, _store, artifacts) = fresh_engine(Vec::new());
    engine.create_container("c1", request("c1", "1.0.0"));

    let handle = artifacts.last_handle().expect("handle");
    handle.fail_next_update(vec!["rule compilation failed".into()]);

    let response = engine.update_container_release("c1", coords("2.0.0"));
    assert!(response.is_failure());
    assert_eq!(response.payload, Some(coords("1.0.0")));

    let release = engine.get_container_release("c1").payload.expect("release");
    assert_eq!(release, coords("1.0.0"));

    let info = engine.get_container_info("c1").payload.expect("info");
    let warning = info
        .messages
        .iter()
        .find(|m| m.severity == Severity::Warn)
        .expect("warn message");
    assert_eq!(warning.details, vec!["rule compilation failed"]);
}

#[test]
fn dispose_is_idempotent() {
    let (engine, _store, _artifacts) = fresh_engine(Vec::new());

    assert!(engine.dispose_container("ghost").is_success());

    engine.create_container("c1", request("c1", "1.0.0"));
    assert!(engine.dispose_container("c1").is_success());
    assert!(engine.dispose_container("c1").is_success());
}

#[test]
fn create_dispose_round_trip_removes_container() {
    let (engine, store, artifacts) = fresh_engine(Vec::new());
    engine.create_container("c1", request("c1", "1.0.0"));

    assert!(engine.dispose_container("c1").is_success());

    let info = engine.get_container_info("c1");
    assert!(info.is_failure());
    assert!(info.message.contains("not instantiated"));
    assert!(engine.list_containers().payload.expect("list").is_empty());

    let handle = artifacts.last_handle().expect("handle");
    assert!(handle.is_disposed());

    let persisted = store.snapshot("srv-test").expect("state");
    assert!(persisted.container("c1").is_none());
}

#[test]
fn engine_rebuilt_from_same_store_reinstalls_containers() {
    let (engine, store, _artifacts) = fresh_engine(Vec::new());
    engine.create_container("c1", request("c1", "1.0.0"));
    engine.create_container("c2", request("c2", "3.1.4"));
    engine.dispose_container("c2");
    engine.destroy();

    let (rebuilt, _artifacts) = engine_with(Vec::new(), store);
    let listed = rebuilt.list_containers().payload.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].container_id, "c1");
    assert_eq!(listed[0].status, ContainerStatus::Started);
}

#[test]
fn extension_fanout_runs_in_start_order() {
    let log = call_log();
    let (engine, _store, _artifacts) = fresh_engine(ordered_extensions(&log));

    engine.create_container("c1", request("c1", "1.0.0"));
    assert_eq!(
        entries_with_prefix(&log, "create:"),
        vec!["create:alpha:c1", "create:beta:c1", "create:gamma:c1"]
    );

    engine.update_container_release("c1", coords("2.0.0"));
    assert_eq!(
        entries_with_prefix(&log, "check:"),
        vec!["check:alpha:c1", "check:beta:c1", "check:gamma:c1"]
    );
    assert_eq!(
        entries_with_prefix(&log, "update:"),
        vec!["update:alpha:c1", "update:beta:c1", "update:gamma:c1"]
    );

    engine.dispose_container("c1");
    assert_eq!(
        entries_with_prefix(&log, "dispose:"),
        vec!["dispose:alpha:c1", "dispose:beta:c1", "dispose:gamma:c1"]
    );
}

#[test]
fn create_failure_keeps_container_failed_without_rollback() {
    let log = call_log();
    let extensions: Vec<Arc<dyn Extension>> = vec![
        Arc::new(RecordingExtension::new("alpha", 1, log.clone())),
        Arc::new(RecordingExtension::new("beta", 2, log.clone()).failing_create()),
        Arc::new(RecordingExtension::new("gamma", 3, log.clone())),
    ];
    let (engine, _store, _artifacts) = fresh_engine(extensions);

    let response = engine.create_container("c1", request("c1", "1.0.0"));
    assert!(response.is_failure());

    // the completed prefix is not rolled back and gamma is never reached
    assert_eq!(
        entries_with_prefix(&log, "create:"),
        vec!["create:alpha:c1", "create:beta:c1"]
    );
    assert!(entries_with_prefix(&log, "dispose:").is_empty());

    let info = engine.get_container_info("c1").payload.expect("info");
    assert_eq!(info.status, ContainerStatus::Failed);
}

#[test]
fn failed_dispose_rolls_back_completed_prefix_in_reverse() {
    let log = call_log();
    let extensions: Vec<Arc<dyn Extension>> = vec![
        Arc::new(RecordingExtension::new("alpha", 1, log.clone())),
        Arc::new(RecordingExtension::new("beta", 2, log.clone())),
        Arc::new(RecordingExtension::new("gamma", 3, log.clone()).failing_dispose()),
    ];
    let (engine, store, _artifacts) = fresh_engine(extensions);
    engine.create_container("c1", request("c1", "1.0.0"));
    log.lock().clear();

    let response = engine.dispose_container("c1");
    assert!(response.is_failure());
    assert!(response.message.contains("EXT_DISPOSE_FAILED"));

    assert_eq!(
        *log.lock(),
        vec![
            "dispose:alpha:c1",
            "dispose:beta:c1",
            "dispose:gamma:c1",
            "create:beta:c1",
            "create:alpha:c1",
        ]
    );

    let info = engine.get_container_info("c1").payload.expect("info");
    assert_eq!(info.status, ContainerStatus::Started);

    // rollback never touches persistence
    let persisted = store.snapshot("srv-test").expect("state");
    assert!(persisted.container("c1").is_some());
}

#[test]
fn per_container_messages_attach_on_reads() {
    let (engine, _store, _artifacts) = fresh_engine(Vec::new());
    engine.create_container("c1", request("c1", "1.0.0"));

    let info = engine.get_container_info("c1").payload.expect("info");
    assert!(info
        .messages
        .iter()
        .any(|m| m.severity == Severity::Info && m.text.contains("successfully created")));

    let listed = engine.list_containers().payload.expect("list");
    assert!(!listed[0].messages.is_empty());
}
