//! Host engine wiring and public operations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use berth_extension::{ArtifactRuntime, Extension, HostContext};
use berth_types::{
    config, ContainerResource, Coordinates, Message, ServerInfo, ServerState, ServiceResponse,
};

use crate::controller::{self, ControllerClient, ControllerConnection};
use crate::error::EngineFault;
use crate::extensions::ExtensionRegistry;
use crate::messages::MessageLogs;
use crate::registry::ContainerRegistry;
use crate::scanner;
use crate::store::StateStore;

/// Version reported in the server info.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static wiring of a [`HostEngine`].
///
/// The persisted configuration map can override `server_name` and `location`
/// through the recognized keys; everything else is fixed at bootstrap.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub server_id: String,
    pub server_name: String,
    pub location: String,
    /// Delay between controller reconnect attempts.
    pub reconnect_interval: Duration,
}

impl EngineConfig {
    #[must_use]
    pub fn new(server_id: impl Into<String>) -> Self {
        let server_id = server_id.into();
        Self {
            server_name: server_id.clone(),
            server_id,
            location: config::DEFAULT_SERVER_LOCATION.to_string(),
            reconnect_interval: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = server_name.into();
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }
}

/// The engine owning the container registry, extension fan-out, scanner
/// control, and the controller handshake.
///
/// Constructed once per process via [`bootstrap`](Self::bootstrap) and shared
/// behind an `Arc`; every public operation takes `&self` and returns the
/// uniform [`ServiceResponse`] envelope.
pub struct HostEngine {
    pub(crate) config: EngineConfig,
    configuration: BTreeMap<String, String>,
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) artifacts: Arc<dyn ArtifactRuntime>,
    pub(crate) extensions: ExtensionRegistry,
    pub(crate) controller: Arc<dyn ControllerClient>,
    pub(crate) registry: ContainerRegistry,
    pub(crate) logs: MessageLogs,
    active: AtomicBool,
    ready: AtomicBool,
}

impl HostEngine {
    /// Builds and starts the engine.
    ///
    /// Loads the persisted state, initializes active extensions in start
    /// order (a failing init is reported as a server message and skipped),
    /// then performs the controller handshake. With no controllers
    /// configured the locally persisted containers are installed; with
    /// controllers configured but unreachable a background reconnect thread
    /// takes over, and startup blocks on it only when the `sync-deployment`
    /// flag is set.
    ///
    /// # Errors
    ///
    /// Returns a fault only when the persisted state cannot be loaded; an
    /// unreachable controller is not fatal.
    pub fn bootstrap(
        config: EngineConfig,
        store: Arc<dyn StateStore>,
        artifacts: Arc<dyn ArtifactRuntime>,
        extensions: Vec<Arc<dyn Extension>>,
        controller: Arc<dyn ControllerClient>,
    ) -> Result<Arc<Self>, EngineFault> {
        let state = store.load(&config.server_id)?;

        let mut config = config;
        if let Some(name) = state.config_value(config::SERVER_NAME) {
            config.server_name = name.to_string();
        }
        if let Some(location) = state.config_value(config::SERVER_LOCATION) {
            config.location = location.to_string();
        }

        let engine = Arc::new(Self {
            config,
            configuration: state.configuration.clone(),
            store,
            artifacts,
            extensions: ExtensionRegistry::new(extensions),
            controller,
            registry: ContainerRegistry::new(),
            logs: MessageLogs::new(),
            active: AtomicBool::new(false),
            ready: AtomicBool::new(false),
        });

        let ctx = engine.host_context();
        for ext in engine.extensions.iter() {
            match ext.init(&ctx) {
                Ok(()) => info!(extension = ext.name(), "extension registered"),
                Err(err) => {
                    error!(extension = ext.name(), error = %err, "extension init failed");
                    engine.logs.server_append(Message::error(format!(
                        "error initializing extension {}: {err}",
                        ext.name()
                    )));
                }
            }
        }

        engine.active.store(true, Ordering::SeqCst);

        let info = engine.server_info();
        match engine.controller.connect(&info) {
            ControllerConnection::Ready(setup) => {
                info!("controller handshake succeeded");
                engine.mark_ready(&info);
                engine.install_containers(setup.containers);
            }
            ControllerConnection::NotDefined => {
                info!("no controllers configured, installing persisted containers");
                engine.mark_ready(&info);
                engine.install_containers(state.containers.clone());
            }
            ControllerConnection::NotConnected => {
                warn!("no controller reachable, delaying container installation");
                let task = controller::spawn_reconnect(Arc::clone(&engine));
                if state.config_flag(config::SYNC_DEPLOYMENT) {
                    info!("sync-deployment set, holding startup until a controller answers");
                    if task.join().is_err() {
                        error!("controller reconnect task panicked");
                    }
                }
            }
        }

        Ok(engine)
    }

    /// Identity, capabilities, and the server-wide message log.
    pub fn get_info(&self) -> ServiceResponse<ServerInfo> {
        let mut info = self.server_info();
        info.messages = self.logs.server_snapshot();
        ServiceResponse::success("server info", info)
    }

    /// Snapshot of every registered container with messages attached.
    pub fn list_containers(&self) -> ServiceResponse<Vec<ContainerResource>> {
        let containers = self
            .registry
            .list()
            .into_iter()
            .map(|instance| {
                let mut resource = instance.resource();
                resource.messages = self.logs.snapshot(instance.container_id());
                resource
            })
            .collect();
        ServiceResponse::success("container list", containers)
    }

    /// One container with messages and scanner state attached.
    pub fn get_container_info(&self, container_id: &str) -> ServiceResponse<ContainerResource> {
        let Some(instance) = self.registry.get(container_id) else {
            return EngineFault::NotFound(format!("container {container_id} is not instantiated"))
                .into_response();
        };

        let mut resource = {
            let mut state = instance.lock();
            if state.resource.scanner.is_none() {
                let current = scanner::scanner_resource(&state);
                state.resource.scanner = Some(current);
            }
            state.resource.clone()
        };
        resource.messages = self.logs.snapshot(container_id);
        ServiceResponse::success(format!("info for container {container_id}"), resource)
    }

    /// Coordinates the container currently runs under.
    pub fn get_container_release(&self, container_id: &str) -> ServiceResponse<Coordinates> {
        let Some(instance) = self.registry.get(container_id) else {
            return EngineFault::NotFound(format!("container {container_id} is not instantiated"))
                .into_response();
        };

        let resource = instance.resource();
        match resource.coordinates.or(resource.resolved_coordinates) {
            Some(coordinates) => ServiceResponse::success(
                format!("release id for container {container_id}"),
                coordinates,
            ),
            None => EngineFault::NotFound(format!("container {container_id} has no release id"))
                .into_response(),
        }
    }

    /// The persisted state document: controllers, configuration, containers.
    pub fn get_server_state(&self) -> ServiceResponse<ServerState> {
        match self.store.load(&self.config.server_id) {
            Ok(state) => ServiceResponse::success(
                format!("server state for {}", self.config.server_id),
                state,
            ),
            Err(err) => EngineFault::from(err).into_response(),
        }
    }

    /// Appends to the server-wide message log.
    pub fn add_server_message(&self, message: Message) {
        self.logs.server_append(message);
    }

    /// Stops the engine: clears the active flag (which ends the reconnect
    /// thread), disconnects from the controller, and destroys extensions in
    /// start order, logging failures without stopping the iteration.
    pub fn destroy(&self) {
        info!(server_id = %self.config.server_id, "shutting down host engine");
        self.active.store(false, Ordering::SeqCst);

        let info = self.server_info();
        self.controller.disconnect(&info);

        let ctx = self.host_context();
        for ext in self.extensions.iter() {
            match ext.destroy(&ctx) {
                Ok(()) => info!(extension = ext.name(), "extension unregistered"),
                Err(err) => {
                    error!(extension = ext.name(), error = %err, "extension destroy failed");
                }
            }
        }
    }

    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.config.server_id
    }

    /// `false` once [`destroy`](Self::destroy) ran; observed by background
    /// tasks between attempts.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// `true` once a container set has been resolved, from the controller or
    /// from local state.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub(crate) fn server_info(&self) -> ServerInfo {
        ServerInfo::new(
            &self.config.server_id,
            &self.config.server_name,
            SERVER_VERSION,
            self.extensions.capabilities(),
            &self.config.location,
        )
    }

    pub(crate) fn host_context(&self) -> HostContext {
        HostContext {
            server_id: self.config.server_id.clone(),
            configuration: self.configuration.clone(),
        }
    }

    /// Marks the container set as resolved and appends the started banner.
    pub(crate) fn mark_ready(&self, info: &ServerInfo) {
        self.ready.store(true, Ordering::SeqCst);
        self.logs.server_append(Message::info(format!(
            "server {info} started successfully at {}",
            Utc::now().to_rfc3339()
        )));
    }

    pub(crate) fn reconnect_interval(&self) -> Duration {
        self.config.reconnect_interval
    }

    /// Loads, mutates, and stores the persisted state as one whole-document
    /// write.
    pub(crate) fn persist_with(
        &self,
        mutate: impl FnOnce(&mut ServerState),
    ) -> Result<(), EngineFault> {
        let mut state = self.store.load(&self.config.server_id)?;
        mutate(&mut state);
        self.store.store(&self.config.server_id, &state)?;
        Ok(())
    }
}

impl fmt::Display for HostEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "berth server id='{}' name='{}' version='{}' location='{}'",
            self.config.server_id, self.config.server_name, SERVER_VERSION, self.config.location
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg = EngineConfig::new("srv-1");
        assert_eq!(cfg.server_name, "srv-1");
        assert_eq!(cfg.location, config::DEFAULT_SERVER_LOCATION);
        assert_eq!(cfg.reconnect_interval, Duration::from_secs(10));
    }

    #[test]
    fn config_builders() {
        let cfg = EngineConfig::new("srv-1")
            .with_name("production east")
            .with_location("http://east.example:8230")
            .with_reconnect_interval(Duration::from_millis(50));
        assert_eq!(cfg.server_name, "production east");
        assert_eq!(cfg.location, "http://east.example:8230");
        assert_eq!(cfg.reconnect_interval, Duration::from_millis(50));
    }
}
