//! Driver acquisition: resolve, list, download, validate and cache drivers.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_lock::Mutex;
use serde::Serialize;
use tracing::info;

use super::coordinates::PackageCoordinates;
use super::downloader::{Downloader, remove_partial};
use super::http::HttpSettings;
use super::repository::{MetadataClient, build_download_url};
use super::storage::{DriverStorage, InstalledDriver};
use super::validator::validate_archive;
use crate::config::DriversConfig;
use crate::error::{Error, Result};
use crate::services::database::plugins::PluginRegistry;
use crate::services::database::traits::Dialect;

/// A published driver version, as seen from the repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableDriver {
    pub dialect: Dialect,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// A file for this version is present in local storage
    pub installed: bool,
    /// The dialect plugin accepts this driver version
    pub supported: bool,
}

/// Result of a successful download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedDriver {
    pub dialect: Dialect,
    pub coordinates: PackageCoordinates,
    pub path: PathBuf,
    pub size: u64,
}

/// Acquires and caches the connectivity drivers of registered dialects.
///
/// Network and filesystem work runs on the blocking thread pool. Downloads
/// to the same destination are serialised.
pub struct DriverService {
    registry: Arc<PluginRegistry>,
    storage: DriverStorage,
    metadata: MetadataClient,
    downloader: Downloader,
    repository_url: String,
    download_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DriverService {
    pub fn new(
        registry: Arc<PluginRegistry>,
        storage: DriverStorage,
        repository_url: impl Into<String>,
        http: HttpSettings,
    ) -> Self {
        let repository_url = repository_url.into();
        Self {
            registry,
            storage,
            metadata: MetadataClient::new(repository_url.clone(), http.clone()),
            downloader: Downloader::new(http),
            repository_url,
            download_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(registry: Arc<PluginRegistry>, config: &DriversConfig) -> Self {
        Self::new(
            registry,
            DriverStorage::new(&config.storage_dir),
            config.repository_url.clone(),
            config.http_settings(),
        )
    }

    pub fn storage(&self) -> &DriverStorage {
        &self.storage
    }

    pub fn repository_url(&self) -> &str {
        &self.repository_url
    }

    /// List every published version of the dialect's driver, newest first,
    /// marking the ones present in local storage.
    pub async fn list_available_drivers(&self, dialect: Dialect) -> Result<Vec<AvailableDriver>> {
        let coords = self.registry.driver_coordinates(dialect, None).await?;
        let spec = self.registry.driver_spec(dialect).await?;

        let metadata = self.metadata.clone();
        let (group_id, artifact_id) = (coords.group_id.clone(), coords.artifact_id.clone());
        let versions =
            smol::unblock(move || metadata.fetch_versions(&group_id, &artifact_id)).await?;

        let installed: HashSet<String> = self
            .list_installed_drivers(dialect)
            .await?
            .into_iter()
            .filter(|d| d.file_name.contains(&coords.artifact_id))
            .map(|d| d.version)
            .collect();

        Ok(versions
            .into_iter()
            .map(|version| AvailableDriver {
                dialect,
                group_id: coords.group_id.clone(),
                artifact_id: coords.artifact_id.clone(),
                installed: installed.contains(&version),
                supported: spec.supports(&version),
                version,
            })
            .collect())
    }

    /// List the driver files cached for a dialect, newest first.
    pub async fn list_installed_drivers(&self, dialect: Dialect) -> Result<Vec<InstalledDriver>> {
        let artifact_id = self
            .registry
            .driver_coordinates(dialect, None)
            .await
            .ok()
            .map(|c| c.artifact_id);

        let storage = self.storage.clone();
        smol::unblock(move || storage.scan_installed(dialect, artifact_id.as_deref())).await
    }

    /// Download a driver version into storage and validate it.
    ///
    /// Re-downloading an installed version overwrites it. A file that fails
    /// validation is removed.
    pub async fn download_driver(&self, dialect: Dialect, version: &str) -> Result<DownloadedDriver> {
        let coords = self
            .registry
            .driver_coordinates(dialect, Some(version))
            .await?;
        self.download_coordinates(dialect, coords).await
    }

    async fn download_coordinates(
        &self,
        dialect: Dialect,
        coords: PackageCoordinates,
    ) -> Result<DownloadedDriver> {
        let path = self.storage.driver_file_path(dialect, &coords)?;
        let url = build_download_url(&coords, &self.repository_url)?;

        let lock = self.download_lock(&path).await;
        let _guard = lock.lock().await;

        info!("Downloading {} driver {} from {}", dialect, coords, url);
        let downloader = self.downloader.clone();
        let directory = self.storage.storage_directory(dialect);
        let destination = path.clone();
        let size = smol::unblock(move || -> Result<u64> {
            DriverStorage::ensure_directory_exists(&directory)?;
            let size = downloader.download(&url, &destination)?;
            if let Err(e) = validate_archive(&destination) {
                remove_partial(&destination);
                return Err(e);
            }
            Ok(size)
        })
        .await?;

        Ok(DownloadedDriver {
            dialect,
            coordinates: coords,
            path,
            size,
        })
    }

    /// Delete the cached file of one driver version.
    pub async fn delete_driver(&self, dialect: Dialect, version: &str) -> Result<()> {
        let driver = self
            .list_installed_drivers(dialect)
            .await?
            .into_iter()
            .find(|d| d.version == version)
            .ok_or_else(|| Error::DriverNotInstalled {
                dialect,
                version: version.to_string(),
            })?;

        let lock = self.download_lock(&driver.path).await;
        let _guard = lock.lock().await;

        smol::unblock(move || DriverStorage::delete_driver(&driver.path)).await
    }

    /// Path of a usable cached driver for the dialect, downloading the
    /// plugin's default driver if none is cached.
    pub async fn ensure_driver_installed(&self, dialect: Dialect) -> Result<PathBuf> {
        let defaults = self.registry.driver_coordinates(dialect, None).await?;
        let spec = self.registry.driver_spec(dialect).await?;

        let cached = self
            .list_installed_drivers(dialect)
            .await?
            .into_iter()
            .find(|d| d.file_name.contains(&defaults.artifact_id) && spec.supports(&d.version));
        if let Some(driver) = cached {
            return Ok(driver.path);
        }

        info!("No cached driver for {}, installing {}", dialect, defaults);
        Ok(self.download_coordinates(dialect, defaults).await?.path)
    }

    async fn download_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.download_locks.lock().await;
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl std::fmt::Debug for DriverService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverService")
            .field("storage", &self.storage)
            .field("repository_url", &self.repository_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::database::plugins::{PluginDescriptor, PluginRegistry};
    use crate::services::drivers::DriverSpec;
    use std::fs;

    fn registry() -> Arc<PluginRegistry> {
        let registry = PluginRegistry::new();
        smol::block_on(registry.register(
            PluginDescriptor::new("test-mysql", Dialect::MySQL).with_driver(
                DriverSpec::new(
                    PackageCoordinates::new("com.mysql", "mysql-connector-j", "8.0.33"),
                    ">=8.0.31",
                )
                .unwrap(),
            ),
        ));
        Arc::new(registry)
    }

    fn service(base: &Path) -> DriverService {
        DriverService::new(
            registry(),
            DriverStorage::new(base),
            "http://127.0.0.1:9",
            HttpSettings::default(),
        )
    }

    #[test]
    fn test_download_unsupported_version() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let err = service(dir.path())
                .download_driver(Dialect::MySQL, "5.1.49")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::UnsupportedDriverVersion { .. }));
            assert_eq!(err.kind(), ErrorKind::Configuration);
        });
    }

    #[test]
    fn test_unregistered_dialect() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let err = service(dir.path())
                .list_available_drivers(Dialect::PostgreSQL)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::PluginNotFound(Dialect::PostgreSQL)));
        });
    }

    #[test]
    fn test_delete_by_version() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let service = service(dir.path());
            let mysql_dir = service.storage().storage_directory(Dialect::MySQL);
            fs::create_dir_all(&mysql_dir).unwrap();
            let path = mysql_dir.join("mysql-connector-j-8.0.33.jar");
            fs::write(&path, b"jar").unwrap();

            let err = service
                .delete_driver(Dialect::MySQL, "8.0.9")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::DriverNotInstalled { .. }));

            service.delete_driver(Dialect::MySQL, "8.0.33").await.unwrap();
            assert!(!path.exists());
        });
    }

    #[test]
    fn test_ensure_installed_prefers_cached_driver() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let service = service(dir.path());
            let mysql_dir = service.storage().storage_directory(Dialect::MySQL);
            fs::create_dir_all(&mysql_dir).unwrap();
            let path = mysql_dir.join("mysql-connector-j-8.2.0.jar");
            fs::write(&path, b"jar").unwrap();

            // the repository is unreachable, so a download would fail
            let found = service.ensure_driver_installed(Dialect::MySQL).await.unwrap();
            assert_eq!(found, path);
        });
    }

    #[test]
    fn test_ensure_installed_ignores_unsupported_cached_versions() {
        smol::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let service = service(dir.path());
            let mysql_dir = service.storage().storage_directory(Dialect::MySQL);
            fs::create_dir_all(&mysql_dir).unwrap();
            fs::write(mysql_dir.join("mysql-connector-j-5.1.49.jar"), b"jar").unwrap();

            let err = service
                .ensure_driver_installed(Dialect::MySQL)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Connectivity);
        });
    }
}
