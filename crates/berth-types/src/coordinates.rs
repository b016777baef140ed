//! Artifact bundle coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version aliases that always resolve to whatever is newest.
const MOVING_ALIASES: [&str; 2] = ["LATEST", "RELEASE"];

/// Suffix marking a version whose concrete resolution may change over time.
const MOVING_SUFFIX: &str = "-SNAPSHOT";

/// Identifies one artifact bundle as a `group:artifact:version` triple.
///
/// The version may be concrete (`1.0.0`) or moving (`1.0.0-SNAPSHOT`,
/// `LATEST`). A moving version resolves to a concrete one when the bundle is
/// materialized; the resolved triple is reported separately on the container
/// resource.
///
/// # Example
///
/// ```
/// use berth_types::Coordinates;
///
/// let release = Coordinates::new("org.example", "demo", "1.0.0");
/// assert!(!release.is_moving());
/// assert_eq!(release.to_string(), "org.example:demo:1.0.0");
///
/// let snapshot = Coordinates::new("org.example", "demo", "1.1.0-SNAPSHOT");
/// assert!(snapshot.is_moving());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    /// Group the artifact belongs to.
    pub group_id: String,
    /// Artifact name within the group.
    pub artifact_id: String,
    /// Concrete or moving version identifier.
    pub version: String,
}

impl Coordinates {
    /// Creates coordinates from the three parts.
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// Returns `true` if the version is a moving identifier whose resolution
    /// may drift, which is what a scanner polls for.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.version.ends_with(MOVING_SUFFIX)
            || MOVING_ALIASES
                .iter()
                .any(|alias| self.version.eq_ignore_ascii_case(alias))
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}
