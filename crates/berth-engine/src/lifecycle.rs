//! Container lifecycle orchestration: create, dispose, release update, and
//! bootstrap installation.
//!
//! Create and dispose hold the per-instance mutex for their whole body. The
//! release update deliberately does not: the cost of synchronizing it against
//! dispose outweighs the rare race, so a concurrent dispose makes the update
//! fail late instead.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use berth_extension::{Extension, ExtensionError, ExtensionParams, MODULE_METADATA};
use berth_types::{ContainerResource, ContainerStatus, Coordinates, Message, ServiceResponse};

use crate::engine::HostEngine;
use crate::error::EngineFault;
use crate::instance::ContainerInstance;

impl HostEngine {
    /// Creates and starts a container for the requested coordinates.
    ///
    /// The container is registered first (compare-and-set; a duplicate id
    /// fails carrying the existing resource), then the artifact is resolved
    /// and every extension wires itself in, in start order. A failure on
    /// this path leaves the container registered as `Failed` with no
    /// rollback of the extensions that already succeeded; the caller is
    /// expected to dispose it.
    pub fn create_container(
        &self,
        container_id: &str,
        container: ContainerResource,
    ) -> ServiceResponse<ContainerResource> {
        let Some(coordinates) = container.coordinates else {
            error!(container_id, "create rejected, no coordinates given");
            return EngineFault::Validation(format!(
                "failed to create container {container_id}: coordinates missing"
            ))
            .into_response();
        };

        let mut messages = Vec::new();
        let response = self.create_container_inner(container_id, coordinates, &mut messages);
        self.logs.replace(container_id, messages);
        response
    }

    fn create_container_inner(
        &self,
        container_id: &str,
        coordinates: Coordinates,
        messages: &mut Vec<Message>,
    ) -> ServiceResponse<ContainerResource> {
        let instance = Arc::new(ContainerInstance::new(container_id, coordinates.clone()));
        let mut state = instance.lock();

        if let Some(existing) = self.registry.register(Arc::clone(&instance)) {
            let fault = EngineFault::Conflict(format!("container {container_id} already exists"));
            messages.push(Message::error(fault.to_string()));
            return fault.into_response_with(existing.resource());
        }

        let handle = match self.artifacts.resolve(&coordinates) {
            Ok(handle) => handle,
            Err(err) => {
                error!(container_id, %coordinates, error = %err, "artifact resolution failed");
                messages.push(Message::error(format!(
                    "artifact could not be resolved for {coordinates}: {err}"
                )));
                state.set_status(ContainerStatus::Failed);
                return EngineFault::from(err).into_response();
            }
        };
        debug!(container_id, %coordinates, "artifact materialized");
        state.artifact = Some(Arc::clone(&handle));
        state.resource.resolved_coordinates = Some(handle.resolved_coordinates());

        let mut params = ExtensionParams::new();
        params.insert(MODULE_METADATA, self.artifacts.module_metadata(&coordinates));
        for ext in self.extensions.iter() {
            if let Err(err) = ext.create_container(container_id, handle.as_ref(), &mut params) {
                error!(
                    container_id,
                    extension = ext.name(),
                    error = %err,
                    "container create failed"
                );
                messages.push(Message::error(format!(
                    "error creating container {container_id} on extension {}: {err}",
                    ext.name()
                )));
                state.set_status(ContainerStatus::Failed);
                return EngineFault::from(err).into_response();
            }
            debug!(container_id, extension = ext.name(), "container create: done");
        }

        state.set_status(ContainerStatus::Started);
        let stored = state.resource.persistent();
        if let Err(fault) = self.persist_with(|doc| doc.set_container(stored)) {
            error!(container_id, error = %fault, "state persistence failed after create");
            messages.push(Message::error(format!(
                "error persisting container {container_id}: {fault}"
            )));
            return fault.into_response();
        }

        info!(container_id, %coordinates, "container started");
        messages.push(Message::info(format!(
            "container {container_id} successfully created with artifact {coordinates}"
        )));
        ServiceResponse::success(
            format!("container {container_id} successfully deployed with artifact {coordinates}"),
            state.resource.clone(),
        )
    }

    /// Disposes a container. Unknown ids succeed, making disposal
    /// idempotent.
    ///
    /// Extensions dispose in start order; if one fails, the already-disposed
    /// prefix is restored in reverse order via their `create_container`
    /// callbacks, the container is re-registered as `Started`, and the
    /// operation fails. Persistence is only touched on full success.
    pub fn dispose_container(&self, container_id: &str) -> ServiceResponse<()> {
        let mut messages = Vec::new();
        let response = self.dispose_container_inner(container_id, &mut messages);
        self.logs.replace(container_id, messages);
        response
    }

    fn dispose_container_inner(
        &self,
        container_id: &str,
        messages: &mut Vec<Message>,
    ) -> ServiceResponse<()> {
        let Some(instance) = self.registry.unregister(container_id) else {
            messages.push(Message::info(format!(
                "container {container_id} was not instantiated"
            )));
            return ServiceResponse::success_empty(format!(
                "container {container_id} was not instantiated"
            ));
        };

        let mut state = instance.lock();
        state.set_status(ContainerStatus::Disposing);

        let Some(handle) = state.artifact.clone() else {
            messages.push(Message::info(format!(
                "container {container_id} was not instantiated"
            )));
            return ServiceResponse::success_empty(format!(
                "container {container_id} was not instantiated"
            ));
        };

        let mut params = ExtensionParams::new();
        let mut disposed: Vec<Arc<dyn Extension>> = Vec::new();
        let mut dispose_error: Option<ExtensionError> = None;
        for ext in self.extensions.iter() {
            match ext.dispose_container(container_id, handle.as_ref(), &mut params) {
                Ok(()) => {
                    debug!(container_id, extension = ext.name(), "container dispose: done");
                    disposed.push(Arc::clone(ext));
                }
                Err(err) => {
                    dispose_error = Some(err);
                    break;
                }
            }
        }

        if let Some(err) = dispose_error {
            warn!(container_id, error = %err, "dispose failed, restoring disposed extensions");
            for ext in disposed.iter().rev() {
                if let Err(restore_err) =
                    ext.create_container(container_id, handle.as_ref(), &mut params)
                {
                    error!(
                        container_id,
                        extension = ext.name(),
                        error = %restore_err,
                        "restore after failed dispose also failed"
                    );
                }
            }
            state.set_status(ContainerStatus::Started);
            if self.registry.register(Arc::clone(&instance)).is_some() {
                warn!(container_id, "container id was re-taken during rollback");
            }
            info!(container_id, "container back to started after failed dispose");
            messages.push(Message::warn(format!(
                "error disposing container {container_id}: {err}, container is running"
            )));
            return EngineFault::from(err).into_response();
        }

        state.artifact = None;
        drop(state);
        // registry no longer references the container, so a failing dispose
        // of the bundle itself cannot bring it back
        handle.dispose();
        info!(container_id, "container stopped");

        if let Err(fault) = self.persist_with(|doc| {
            doc.remove_container(container_id);
        }) {
            error!(container_id, error = %fault, "state persistence failed after dispose");
            messages.push(Message::error(format!(
                "error persisting dispose of container {container_id}: {fault}"
            )));
            return fault.into_response();
        }

        messages.push(Message::info(format!(
            "container {container_id} successfully stopped"
        )));
        ServiceResponse::success_empty(format!("container {container_id} successfully disposed"))
    }

    /// Upgrades a container to another version in place.
    ///
    /// A container that is not materialized falls through to a fresh create.
    /// Every extension gets a pre-flight veto before anything is written;
    /// then codec caches are invalidated, the bundle swaps versions, the
    /// extensions react, and the new coordinates are persisted.
    pub fn update_container_release(
        &self,
        container_id: &str,
        coordinates: Coordinates,
    ) -> ServiceResponse<Coordinates> {
        self.logs.clear(container_id);

        let instance = self.registry.get(container_id);
        let handle = instance.as_ref().and_then(|i| i.artifact());
        let (Some(instance), Some(handle)) = (instance, handle) else {
            debug!(container_id, "not materialized, attempting fresh create");
            let request = ContainerResource::new(
                container_id,
                Some(coordinates.clone()),
                ContainerStatus::Started,
            );
            let response = self.create_container(container_id, request);
            if response.is_success() {
                let installed = response
                    .payload
                    .and_then(|r| r.coordinates)
                    .unwrap_or(coordinates);
                return ServiceResponse::success("release id successfully updated", installed);
            }
            return EngineFault::NotFound(format!(
                "container {container_id} is not instantiated"
            ))
            .into_response();
        };

        let mut params = ExtensionParams::new();
        params.insert(MODULE_METADATA, self.artifacts.module_metadata(&coordinates));
        for ext in self.extensions.iter() {
            if !ext.is_update_allowed(container_id, handle.as_ref(), &mut params) {
                let reason = params
                    .failure_reason()
                    .unwrap_or("update refused by extension")
                    .to_string();
                warn!(container_id, extension = ext.name(), reason = %reason, "update rejected");
                self.logs.append(container_id, Message::warn(reason.clone()));
                return EngineFault::UpdateRejected(reason).into_response();
            }
            debug!(container_id, extension = ext.name(), "update allowed");
        }

        instance.lock().clear_codec_caches();

        let outcome = handle.update_to_version(&coordinates);
        if outcome.has_errors() {
            let details = outcome.error_texts();
            error!(container_id, %coordinates, ?details, "artifact update reported errors");
            self.logs.append(
                container_id,
                Message::warn(format!(
                    "error updating release for container {container_id} to {coordinates}"
                ))
                .with_details(details),
            );
            let fault = EngineFault::Update(format!(
                "error updating release on container {container_id} to {coordinates}"
            ));
            // the handle may or may not have swapped; expose the pre-update view
            return match instance.resource().resolved_coordinates {
                Some(previous) => fault.into_response_with(previous),
                None => fault.into_response(),
            };
        }

        for ext in self.extensions.iter() {
            if let Err(err) = ext.update_container(container_id, handle.as_ref(), &mut params) {
                error!(
                    container_id,
                    extension = ext.name(),
                    error = %err,
                    "extension update failed"
                );
                self.logs.append(
                    container_id,
                    Message::warn(format!(
                        "error updating release for container {container_id}: {err}"
                    )),
                );
                return EngineFault::from(err).into_response();
            }
            debug!(container_id, extension = ext.name(), "extension updated");
        }

        let resolved = handle.resolved_coordinates();
        {
            let mut state = instance.lock();
            state.resource.coordinates = Some(coordinates.clone());
            state.resource.resolved_coordinates = Some(resolved.clone());
        }

        if let Err(fault) = self.persist_with(|doc| {
            if let Some(entry) = doc
                .containers
                .iter_mut()
                .find(|c| c.container_id == container_id)
            {
                entry.coordinates = Some(coordinates.clone());
                entry.resolved_coordinates = Some(resolved.clone());
            }
        }) {
            error!(container_id, error = %fault, "state persistence failed after update");
            self.logs.append(
                container_id,
                Message::error(format!(
                    "error persisting release update of container {container_id}: {fault}"
                )),
            );
            return fault.into_response();
        }

        info!(container_id, %coordinates, "release id updated");
        self.logs.append(
            container_id,
            Message::info(format!(
                "release id successfully updated for container {container_id}"
            )),
        );
        ServiceResponse::success("release id successfully updated", coordinates)
    }

    /// Installs a resolved container set at bootstrap, one create per entry;
    /// failures are logged and installation continues.
    pub fn install_containers(&self, containers: Vec<ContainerResource>) {
        for container in containers {
            let container_id = container.container_id.clone();
            let response = self.create_container(&container_id, container);
            if response.is_failure() {
                warn!(
                    container_id = %container_id,
                    message = %response.message,
                    "container installation failed"
                );
            }
        }
    }
}
