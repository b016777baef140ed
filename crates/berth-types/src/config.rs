//! Recognized configuration keys.
//!
//! The server configuration is a free-form string map persisted with the
//! server state; these are the keys the engine itself reads.

/// Block startup until the controller handshake completes (`"true"` only).
pub const SYNC_DEPLOYMENT: &str = "sync-deployment";

/// Public URL under which this server is reachable.
pub const SERVER_LOCATION: &str = "server-location";

/// Server id override.
pub const SERVER_ID: &str = "server-id";

/// Human-readable server name override.
pub const SERVER_NAME: &str = "server-name";

/// Location used when none is configured.
pub const DEFAULT_SERVER_LOCATION: &str = "http://localhost:8230/berth/services/rest/server";
