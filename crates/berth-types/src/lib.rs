//! Data model for the berth container host.
//!
//! This crate is the stable bottom layer of the berth workspace. It holds
//! every type that crosses a crate boundary: artifact coordinates, container
//! and scanner resources, the persisted server state, messages, and the
//! uniform response envelope returned by every engine operation.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  berth-types     : data model, ErrorCode  ◄── HERE  │
//! │  berth-extension : Extension trait, artifact seam   │
//! ├─────────────────────────────────────────────────────┤
//! │  berth-engine    : registry, lifecycle, controller  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is plain data: `serde` round-trips, no behavior beyond
//! small helpers. The engine and extensions never exchange live objects
//! through these types.

pub mod config;
mod coordinates;
mod error;
mod info;
mod message;
mod resource;
mod response;
mod state;
mod status;

pub use coordinates::Coordinates;
pub use error::{assert_error_codes, ErrorCode};
pub use info::ServerInfo;
pub use message::{Message, Severity};
pub use resource::{ContainerResource, ScannerResource};
pub use response::{ResponseKind, ServiceResponse};
pub use state::ServerState;
pub use status::{ContainerStatus, ScannerStatus};
