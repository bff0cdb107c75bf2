//! Driver acquisition pipeline.
//!
//! Resolves the package coordinates of a dialect's connectivity driver,
//! queries the remote repository for published versions, downloads and
//! validates artifacts, and manages the local driver cache.
//!
//! # Example
//!
//! ```ignore
//! use sqlbridge::services::drivers::DriverService;
//!
//! let service = DriverService::from_config(registry, &config.drivers);
//! let versions = service.list_available_drivers(Dialect::MySQL).await?;
//! let driver = service.download_driver(Dialect::MySQL, "8.0.33").await?;
//! ```

mod coordinates;
mod downloader;
mod http;
mod repository;
mod service;
mod storage;
mod validator;
mod version;

pub use coordinates::{DriverSpec, PackageCoordinates};
pub use downloader::Downloader;
pub use http::HttpSettings;
pub use repository::{
    ARCHIVE_EXTENSION, DEFAULT_REPOSITORY_URL, MetadataClient, build_download_url,
    build_metadata_url, parse_download_url, parse_metadata_versions,
};
pub use service::{AvailableDriver, DownloadedDriver, DriverService};
pub use storage::{DriverStorage, InstalledDriver, UNKNOWN_VERSION};
pub use validator::{ARCHIVE_MAGIC, validate_archive};
pub use version::{
    compare_versions, extract_version_from_file_name, lenient_version, sort_newest_first,
};
