//! Plug-in surface of the berth container host.
//!
//! Two seams live here, both consumed by `berth-engine` and implemented by
//! external crates:
//!
//! - [`Extension`]: a capability module invoked during container lifecycle.
//!   Extensions are discovered once at startup, ordered by
//!   [`start_order`](Extension::start_order), and fanned out over for every
//!   create, update, and dispose.
//! - The artifact seam ([`ArtifactRuntime`], [`ArtifactHandle`],
//!   [`ArtifactScanner`]): the resolver that materializes a bundle from
//!   coordinates, the live handle to one materialized bundle, and the
//!   per-container poller that pulls newer versions of a moving coordinate.
//!
//! # Ownership Contract
//!
//! Extensions receive containers only for the duration of a callback and
//! must not cache the handle or the id-to-instance mapping; the engine's
//! registry is the single owner. The [`HostContext`] passed to `init` and
//! `destroy` is a value snapshot for the same reason.

mod artifact;
mod error;
mod extension;

pub use artifact::{
    ArtifactError, ArtifactHandle, ArtifactRuntime, ArtifactScanner, RawScannerStatus,
    UpdateOutcome,
};
pub use error::ExtensionError;
pub use extension::{Extension, ExtensionParams, HostContext, FAILURE_REASON, MODULE_METADATA};
