//! Remote control plane client and reconnect task.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use berth_types::{ContainerResource, ServerInfo};

use crate::engine::HostEngine;

/// Container set a controller hands down during the handshake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSetup {
    #[serde(default)]
    pub containers: Vec<ContainerResource>,
}

/// Three-way outcome of a controller handshake.
#[derive(Debug, Clone)]
pub enum ControllerConnection {
    /// A controller answered and dictated the container set.
    Ready(ServerSetup),
    /// No controllers are configured; locally persisted state decides.
    NotDefined,
    /// Controllers are configured but none answered.
    NotConnected,
}

/// Handshake seam with the remote control plane.
pub trait ControllerClient: Send + Sync {
    /// Announces the server and asks for its container set.
    fn connect(&self, info: &ServerInfo) -> ControllerConnection;

    /// Tells the control plane the server is going away. Best effort.
    fn disconnect(&self, info: &ServerInfo);
}

/// Default client: posts the server info to each configured endpoint until
/// one accepts the handshake.
pub struct RestControllerClient {
    endpoints: Vec<String>,
    http: reqwest::blocking::Client,
}

impl RestControllerClient {
    /// Endpoints typically come from the persisted state's controller list.
    #[must_use]
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            http: reqwest::blocking::Client::new(),
        }
    }

    fn server_url(endpoint: &str, server_id: &str) -> String {
        format!("{}/server/{server_id}", endpoint.trim_end_matches('/'))
    }
}

impl ControllerClient for RestControllerClient {
    fn connect(&self, info: &ServerInfo) -> ControllerConnection {
        if self.endpoints.is_empty() {
            return ControllerConnection::NotDefined;
        }

        for endpoint in &self.endpoints {
            let url = Self::server_url(endpoint, &info.server_id);
            match self.http.put(&url).json(info).send() {
                Ok(response) if response.status().is_success() => {
                    match response.json::<ServerSetup>() {
                        Ok(setup) => {
                            info!(endpoint = %endpoint, "connected to controller");
                            return ControllerConnection::Ready(setup);
                        }
                        Err(err) => {
                            warn!(endpoint = %endpoint, error = %err, "controller sent an unreadable setup");
                        }
                    }
                }
                Ok(response) => {
                    debug!(endpoint = %endpoint, status = %response.status(), "controller refused handshake");
                }
                Err(err) => {
                    debug!(endpoint = %endpoint, error = %err, "controller not reachable");
                }
            }
        }
        ControllerConnection::NotConnected
    }

    fn disconnect(&self, info: &ServerInfo) {
        for endpoint in &self.endpoints {
            let url = Self::server_url(endpoint, &info.server_id);
            if let Err(err) = self.http.delete(&url).send() {
                debug!(endpoint = %endpoint, error = %err, "disconnect notification failed");
            }
        }
    }
}

/// Spawns the background reconnect thread.
///
/// The thread re-checks the engine-active flag between attempts and exits
/// when it clears. On the first successful handshake it installs the
/// handed-down containers, marks the engine ready, and exits.
pub(crate) fn spawn_reconnect(engine: Arc<HostEngine>) -> JoinHandle<()> {
    thread::spawn(move || {
        let info = engine.server_info();
        info!("controller reconnect task started");
        while engine.is_active() {
            match engine.controller.connect(&info) {
                ControllerConnection::Ready(setup) => {
                    info!("controller connection established");
                    engine.mark_ready(&info);
                    engine.install_containers(setup.containers);
                    return;
                }
                ControllerConnection::NotDefined => {
                    // controllers disappeared from the configuration mid-retry
                    return;
                }
                ControllerConnection::NotConnected => {
                    debug!("controller still unreachable");
                    thread::sleep(engine.reconnect_interval());
                }
            }
        }
        info!("controller reconnect task stopped");
    })
}
