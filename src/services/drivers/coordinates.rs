//! Package coordinates and per-dialect driver specifications.

use serde::{Deserialize, Serialize};

use super::version::lenient_version;
use crate::error::{Error, Result};

/// The (group, artifact, version) triple identifying one driver artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl PackageCoordinates {
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

    /// `group:artifact:version`
    pub fn to_coordinate_string(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// All three fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.group_id.trim().is_empty()
            && !self.artifact_id.trim().is_empty()
            && !self.version.trim().is_empty()
    }

    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(Error::IncompleteCoordinates(self.to_coordinate_string()))
        }
    }

    /// Same artifact, different version.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for PackageCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_coordinate_string())
    }
}

/// The driver a dialect plugin ships with, and the driver versions it can use.
#[derive(Debug, Clone)]
pub struct DriverSpec {
    default_coordinates: PackageCoordinates,
    supported: semver::VersionReq,
}

impl DriverSpec {
    /// Create a driver spec.
    ///
    /// # Errors
    ///
    /// Returns a Configuration error if the default coordinates are incomplete
    /// or `supported` is not a valid version requirement.
    pub fn new(default_coordinates: PackageCoordinates, supported: &str) -> Result<Self> {
        default_coordinates.ensure_complete()?;
        let supported = semver::VersionReq::parse(supported).map_err(|e| {
            Error::InvalidConfig(format!("invalid driver version range '{}': {}", supported, e))
        })?;
        Ok(Self {
            default_coordinates,
            supported,
        })
    }

    pub fn default_coordinates(&self) -> &PackageCoordinates {
        &self.default_coordinates
    }

    pub fn supported_versions(&self) -> &semver::VersionReq {
        &self.supported
    }

    /// Whether this driver version can be used by the plugin.
    pub fn supports(&self, version: &str) -> bool {
        lenient_version(version).is_some_and(|v| self.supported.matches(&v))
    }

    /// Resolve coordinates for a version, or the default coordinates when no
    /// version is requested. `None` if the version is outside the supported
    /// range.
    pub fn resolve(&self, version: Option<&str>) -> Option<PackageCoordinates> {
        match version.map(str::trim).filter(|v| !v.is_empty()) {
            None => Some(self.default_coordinates.clone()),
            Some(v) if self.supports(v) => Some(self.default_coordinates.with_version(v)),
            Some(_) => None,
        }
    }
}
