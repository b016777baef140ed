//! Extension trait and callback parameters.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::{ArtifactHandle, ExtensionError};

/// Params key under which the engine passes the module metadata of the
/// coordinates being installed or updated.
pub const MODULE_METADATA: &str = "module-metadata";

/// Params key an extension fills when it refuses an update.
pub const FAILURE_REASON: &str = "failure-reason";

/// Shared parameter map threaded through one lifecycle fan-out.
///
/// The same map instance is passed to every extension of a fan-out, so
/// extensions can hand values downstream; payloads are opaque
/// [`serde_json::Value`]s.
#[derive(Debug, Default)]
pub struct ExtensionParams {
    values: HashMap<String, Value>,
}

impl ExtensionParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Records why an update was refused; read back by the engine when
    /// [`Extension::is_update_allowed`] returns `false`.
    pub fn set_failure_reason(&mut self, reason: impl Into<String>) {
        self.values
            .insert(FAILURE_REASON.to_string(), Value::String(reason.into()));
    }

    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.get_str(FAILURE_REASON)
    }
}

/// Value snapshot of the host handed to [`Extension::init`] and
/// [`Extension::destroy`].
///
/// Deliberately not a live engine reference: extensions hold containers only
/// for the duration of a callback and must not retain host state.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub server_id: String,
    pub configuration: BTreeMap<String, String>,
}

/// A pluggable capability module invoked during container lifecycle.
///
/// # Ordering
///
/// Fan-outs (init, create, update, dispose) run in ascending
/// [`start_order`](Self::start_order), ties broken by registration order.
/// Rollback after a failed dispose runs over the successfully-completed
/// prefix in reverse.
///
/// # Concurrency
///
/// One extension instance serves all containers; callbacks for distinct
/// containers run on distinct threads concurrently, so implementations use
/// interior mutability for any shared state.
///
/// # Example
///
/// ```
/// use berth_extension::{Extension, ExtensionError, ExtensionParams, ArtifactHandle};
///
/// struct RulesExtension;
///
/// impl Extension for RulesExtension {
///     fn name(&self) -> &str {
///         "rules"
///     }
///
///     fn start_order(&self) -> i32 {
///         0
///     }
///
///     fn implemented_capability(&self) -> &str {
///         "BRM"
///     }
///
///     fn create_container(
///         &self,
///         _container_id: &str,
///         _artifact: &dyn ArtifactHandle,
///         _params: &mut ExtensionParams,
///     ) -> Result<(), ExtensionError> {
///         Ok(())
///     }
///
///     fn dispose_container(
///         &self,
///         _container_id: &str,
///         _artifact: &dyn ArtifactHandle,
///         _params: &mut ExtensionParams,
///     ) -> Result<(), ExtensionError> {
///         Ok(())
///     }
///
///     fn update_container(
///         &self,
///         _container_id: &str,
///         _artifact: &dyn ArtifactHandle,
///         _params: &mut ExtensionParams,
///     ) -> Result<(), ExtensionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait Extension: Send + Sync {
    /// Extension name, used in logs and messages.
    fn name(&self) -> &str;

    /// Inactive extensions are skipped entirely at startup.
    fn is_active(&self) -> bool {
        true
    }

    /// Position in the lifecycle fan-out order; lower starts earlier.
    fn start_order(&self) -> i32;

    /// Capability string advertised in the server info.
    fn implemented_capability(&self) -> &str;

    /// One-time initialization at engine startup.
    ///
    /// # Errors
    ///
    /// A failing init is reported as a server-wide error message; the engine
    /// skips the extension and continues starting.
    fn init(&self, _ctx: &HostContext) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// One-time teardown at engine shutdown.
    ///
    /// # Errors
    ///
    /// Failures are logged; shutdown continues with the next extension.
    fn destroy(&self, _ctx: &HostContext) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Wires this capability into a container being created.
    ///
    /// Also invoked to restore a container when a later extension's dispose
    /// failed and the completed prefix is rolled back.
    ///
    /// # Errors
    ///
    /// An error aborts the fan-out and leaves the container failed.
    fn create_container(
        &self,
        container_id: &str,
        artifact: &dyn ArtifactHandle,
        params: &mut ExtensionParams,
    ) -> Result<(), ExtensionError>;

    /// Releases everything this capability holds for the container.
    ///
    /// # Errors
    ///
    /// An error triggers rollback of the extensions already disposed.
    fn dispose_container(
        &self,
        container_id: &str,
        artifact: &dyn ArtifactHandle,
        params: &mut ExtensionParams,
    ) -> Result<(), ExtensionError>;

    /// Reacts to a completed in-place version upgrade.
    ///
    /// # Errors
    ///
    /// An error surfaces the update as failed to the caller.
    fn update_container(
        &self,
        container_id: &str,
        artifact: &dyn ArtifactHandle,
        params: &mut ExtensionParams,
    ) -> Result<(), ExtensionError>;

    /// Pre-flight veto for a version upgrade. Refusals record their reason
    /// under [`FAILURE_REASON`] in `params`.
    fn is_update_allowed(
        &self,
        _container_id: &str,
        _artifact: &dyn ArtifactHandle,
        _params: &mut ExtensionParams,
    ) -> bool {
        true
    }
}
