//! Server identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Message;

/// Identity and capability summary of a running server.
///
/// This is both the payload of `get_info` and the document the controller
/// client sends during the handshake. `capabilities` is the concatenation of
/// every active extension's implemented capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_id: String,
    pub server_name: String,
    pub version: String,
    pub capabilities: Vec<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl ServerInfo {
    #[must_use]
    pub fn new(
        server_id: impl Into<String>,
        server_name: impl Into<String>,
        version: impl Into<String>,
        capabilities: Vec<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            server_id: server_id.into(),
            server_name: server_name.into(),
            version: version.into(),
            capabilities,
            location: location.into(),
            messages: Vec::new(),
        }
    }
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) version {} at {}",
            self.server_id, self.server_name, self.version, self.location
        )
    }
}
