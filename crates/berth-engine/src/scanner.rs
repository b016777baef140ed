//! Per-container scanner control.
//!
//! The scanner itself is an external object supplied by the artifact
//! runtime; the engine only drives its substate machine and folds the raw
//! statuses into the exposed set. Transitions on a single container run
//! under the instance mutex and are therefore linearizable.

use tracing::{debug, warn};

use berth_extension::RawScannerStatus;
use berth_types::{Message, ScannerResource, ScannerStatus, ServiceResponse};

use crate::engine::HostEngine;
use crate::error::EngineFault;
use crate::instance::InstanceState;

/// Folds a raw runtime status into the exposed scanner status.
#[must_use]
pub fn map_raw_status(raw: RawScannerStatus) -> ScannerStatus {
    match raw {
        RawScannerStatus::Starting => ScannerStatus::Created,
        RawScannerStatus::Running => ScannerStatus::Started,
        RawScannerStatus::Scanning | RawScannerStatus::Updating => ScannerStatus::Scanning,
        RawScannerStatus::Stopped => ScannerStatus::Stopped,
        RawScannerStatus::Shutdown => ScannerStatus::Disposed,
    }
}

/// Scanner projection of an instance; an empty slot reads as `Disposed`.
pub(crate) fn scanner_resource(state: &InstanceState) -> ScannerResource {
    match &state.scanner {
        Some(scanner) => ScannerResource {
            status: map_raw_status(scanner.status()),
            poll_interval_ms: scanner.poll_interval_ms(),
        },
        None => ScannerResource::new(ScannerStatus::Disposed),
    }
}

fn unknown_container<T>(container_id: &str) -> ServiceResponse<T> {
    EngineFault::NotFound(format!("unknown container {container_id}")).into_response()
}

impl HostEngine {
    /// Reports the scanner state of a container.
    pub fn get_scanner_info(&self, container_id: &str) -> ServiceResponse<ScannerResource> {
        let Some(instance) = self.registry.get(container_id) else {
            return unknown_container(container_id);
        };
        let mut state = instance.lock();
        if state.artifact.is_none() {
            return unknown_container(container_id);
        }

        let info = scanner_resource(&state);
        state.resource.scanner = Some(info.clone());
        ServiceResponse::success("scanner info successfully retrieved", info)
    }

    /// Drives the scanner toward the requested status.
    ///
    /// | target | precondition | effect |
    /// |--------|--------------|--------|
    /// | `Created` | no scanner yet | instantiate, bound to the artifact |
    /// | `Started` | stopped, interval > 0 | start polling (auto-creates) |
    /// | `Stopped` | started or scanning | stop polling |
    /// | `Scanning` | stopped, created, or started | one immediate scan (auto-creates) |
    /// | `Disposed` | any | stop if running, then shut down and clear the slot |
    ///
    /// Forbidden transitions fail without touching the scanner. Every
    /// transition replaces the container's message log with a single line
    /// describing the outcome.
    pub fn update_scanner(
        &self,
        container_id: &str,
        target: ScannerResource,
    ) -> ServiceResponse<ScannerResource> {
        let Some(instance) = self.registry.get(container_id) else {
            return unknown_container(container_id);
        };
        let mut state = instance.lock();
        if state.artifact.is_none() {
            return unknown_container(container_id);
        }

        self.logs.clear(container_id);
        let response = match target.status {
            ScannerStatus::Created => self.scanner_create(container_id, &mut state),
            ScannerStatus::Started => self.scanner_start(container_id, &target, &mut state),
            ScannerStatus::Stopped => self.scanner_stop(container_id, &mut state),
            ScannerStatus::Scanning => self.scanner_scan_now(container_id, &mut state),
            ScannerStatus::Disposed => self.scanner_dispose(container_id, &mut state),
            ScannerStatus::Unknown => EngineFault::Validation(format!(
                "unknown scanner status requested for container {container_id}"
            ))
            .into_response(),
        };
        state.resource.scanner = response.payload.clone();
        response
    }

    fn scanner_create(
        &self,
        container_id: &str,
        state: &mut InstanceState,
    ) -> ServiceResponse<ScannerResource> {
        if state.scanner.is_some() {
            return EngineFault::Conflict(format!(
                "error creating scanner for container {container_id}: scanner already exists"
            ))
            .into_response();
        }
        let Some(handle) = state.artifact.clone() else {
            return unknown_container(container_id);
        };

        match handle.new_scanner() {
            Ok(scanner) => {
                state.scanner = Some(scanner);
                debug!(container_id, "scanner created");
                self.logs
                    .append(container_id, Message::info("scanner successfully created"));
                ServiceResponse::success("scanner successfully created", scanner_resource(state))
            }
            Err(err) => {
                warn!(container_id, error = %err, "scanner creation failed");
                EngineFault::from(err).into_response()
            }
        }
    }

    fn scanner_start(
        &self,
        container_id: &str,
        target: &ScannerResource,
        state: &mut InstanceState,
    ) -> ServiceResponse<ScannerResource> {
        if state.scanner.is_none() {
            let created = self.scanner_create(container_id, state);
            if created.is_failure() {
                return created;
            }
        }
        let Some(scanner) = state.scanner.as_ref() else {
            return EngineFault::Conflict(format!(
                "scanner for container {container_id} is not instantiated"
            ))
            .into_response();
        };

        let current = map_raw_status(scanner.status());
        match (current, target.poll_interval_ms) {
            (ScannerStatus::Stopped, Some(interval)) if interval > 0 => {
                scanner.start(interval);
                self.logs.append(
                    container_id,
                    Message::info(format!(
                        "scanner successfully started with interval {interval} ms"
                    )),
                );
                ServiceResponse::success("scanner successfully started", scanner_resource(state))
            }
            (status, _) if status != ScannerStatus::Stopped => {
                self.logs.append(
                    container_id,
                    Message::warn(format!("invalid scanner status: {status}")),
                );
                EngineFault::Conflict(format!("invalid scanner status: {status}"))
                    .into_response_with(scanner_resource(state))
            }
            (_, interval) => {
                self.logs.append(
                    container_id,
                    Message::warn(format!("invalid polling interval: {interval:?}")),
                );
                EngineFault::Validation(format!("invalid polling interval: {interval:?}"))
                    .into_response_with(scanner_resource(state))
            }
        }
    }

    fn scanner_stop(
        &self,
        container_id: &str,
        state: &mut InstanceState,
    ) -> ServiceResponse<ScannerResource> {
        let Some(scanner) = state.scanner.as_ref() else {
            return EngineFault::Conflict(format!(
                "invalid call, scanner is not instantiated for container {container_id}"
            ))
            .into_response();
        };

        let current = map_raw_status(scanner.status());
        if current.is_running() {
            scanner.stop();
            self.logs
                .append(container_id, Message::info("scanner successfully stopped"));
            ServiceResponse::success("scanner successfully stopped", scanner_resource(state))
        } else {
            self.logs.append(
                container_id,
                Message::warn(format!("invalid scanner status: {current}")),
            );
            EngineFault::Conflict(format!("invalid scanner status: {current}"))
                .into_response_with(scanner_resource(state))
        }
    }

    fn scanner_scan_now(
        &self,
        container_id: &str,
        state: &mut InstanceState,
    ) -> ServiceResponse<ScannerResource> {
        if state.scanner.is_none() {
            let created = self.scanner_create(container_id, state);
            if created.is_failure() {
                return created;
            }
        }
        let Some(scanner) = state.scanner.as_ref() else {
            return EngineFault::Conflict(format!(
                "scanner for container {container_id} is not instantiated"
            ))
            .into_response();
        };

        let current = map_raw_status(scanner.status());
        if matches!(
            current,
            ScannerStatus::Stopped | ScannerStatus::Created | ScannerStatus::Started
        ) {
            scanner.scan_now();
            self.logs
                .append(container_id, Message::info("scan successfully triggered"));
            ServiceResponse::success("scan successfully executed", scanner_resource(state))
        } else {
            self.logs.append(
                container_id,
                Message::warn(format!("invalid scanner status: {current}")),
            );
            EngineFault::Conflict(format!("invalid scanner status: {current}"))
                .into_response_with(scanner_resource(state))
        }
    }

    fn scanner_dispose(
        &self,
        container_id: &str,
        state: &mut InstanceState,
    ) -> ServiceResponse<ScannerResource> {
        if state.scanner.is_none() {
            self.logs
                .append(container_id, Message::info("scanner already disposed"));
            return ServiceResponse::success("scanner already disposed", scanner_resource(state));
        }

        let running = state
            .scanner
            .as_ref()
            .is_some_and(|s| map_raw_status(s.status()).is_running());
        if running {
            let stopped = self.scanner_stop(container_id, state);
            if stopped.is_failure() {
                return stopped;
            }
        }

        if let Some(scanner) = state.scanner.take() {
            scanner.shutdown();
        }
        self.logs
            .append(container_id, Message::info("scanner successfully shut down"));
        ServiceResponse::success("scanner successfully shut down", scanner_resource(state))
    }
}
