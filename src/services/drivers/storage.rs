//! On-disk layout of cached drivers.
//!
//! ```text
//! {base_dir}/{Dialect display name}/{artifactId}-{version}.jar
//! ```
//!
//! The presence of a file is the only record that a driver is installed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::coordinates::PackageCoordinates;
use super::repository::ARCHIVE_EXTENSION;
use super::version::{compare_versions, extract_version_from_file_name};
use crate::error::{Error, Result};
use crate::services::database::traits::Dialect;

/// Version reported for driver files whose name carries no version.
pub const UNKNOWN_VERSION: &str = "unknown";

/// A driver file found in the storage directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledDriver {
    pub dialect: Dialect,
    pub version: String,
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Path computation and filesystem operations for cached drivers.
#[derive(Debug, Clone)]
pub struct DriverStorage {
    base_dir: PathBuf,
}

impl DriverStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the drivers of one dialect.
    pub fn storage_directory(&self, dialect: Dialect) -> PathBuf {
        self.base_dir.join(dialect.display_name())
    }

    /// Canonical file name: `{artifactId}-{version}.jar`.
    pub fn driver_file_name(coords: &PackageCoordinates) -> String {
        format!(
            "{}-{}.{}",
            coords.artifact_id, coords.version, ARCHIVE_EXTENSION
        )
    }

    pub fn driver_file_path(&self, dialect: Dialect, coords: &PackageCoordinates) -> Result<PathBuf> {
        coords.ensure_complete()?;
        Ok(self
            .storage_directory(dialect)
            .join(Self::driver_file_name(coords)))
    }

    /// Create `path` and its parents. Fails if `path` exists but is not a directory.
    pub fn ensure_directory_exists(path: &Path) -> Result<()> {
        if path.exists() {
            if !path.is_dir() {
                return Err(Error::storage(path, "path exists but is not a directory"));
            }
            return Ok(());
        }
        fs::create_dir_all(path).map_err(|e| Error::storage(path, e))
    }

    /// An existing, regular, readable file.
    pub fn driver_exists(path: &Path) -> bool {
        path.is_file() && fs::File::open(path).is_ok()
    }

    pub fn delete_driver(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::storage(path, "driver file not found"));
        }
        fs::remove_file(path).map_err(|e| Error::storage(path, e))?;
        info!("Deleted driver {}", path.display());
        Ok(())
    }

    /// List the driver files of a dialect, newest version first.
    ///
    /// When `artifact_id` is given, canonical `{artifactId}-{version}.jar`
    /// names are parsed exactly; other names fall back to extracting the
    /// numeric version from the file name.
    pub fn scan_installed(
        &self,
        dialect: Dialect,
        artifact_id: Option<&str>,
    ) -> Result<Vec<InstalledDriver>> {
        let dir = self.storage_directory(dialect);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut drivers = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| Error::storage(&dir, e))? {
            let entry = entry.map_err(|e| Error::storage(&dir, e))?;
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || !file_name.ends_with(&format!(".{}", ARCHIVE_EXTENSION)) {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| Error::storage(&path, e))?;
            let version = artifact_id
                .and_then(|artifact| canonical_version(file_name, artifact))
                .or_else(|| extract_version_from_file_name(file_name))
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string());

            drivers.push(InstalledDriver {
                dialect,
                version,
                file_name: file_name.to_string(),
                path: path.clone(),
                size: metadata.len(),
                last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        drivers.sort_by(|a, b| compare_versions(&b.version, &a.version));
        Ok(drivers)
    }
}

fn canonical_version(file_name: &str, artifact_id: &str) -> Option<String> {
    let version = file_name
        .strip_prefix(artifact_id)?
        .strip_prefix('-')?
        .strip_suffix(ARCHIVE_EXTENSION)?
        .strip_suffix('.')?;
    (!version.is_empty()).then(|| version.to_string())
}
