//! Artifact download to the local filesystem.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use super::http::{HttpSettings, transport_error};
use crate::error::{Error, Result};

/// Streams artifacts from a URL to a destination path.
///
/// A failure after the destination file was created removes it, so an
/// interrupted transfer never leaves a partial artifact behind.
#[derive(Debug, Clone, Default)]
pub struct Downloader {
    http: HttpSettings,
}

impl Downloader {
    pub fn new(http: HttpSettings) -> Self {
        Self { http }
    }

    /// Download `url` to `destination`, overwriting any existing file.
    /// Returns the number of bytes written.
    pub fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let response = self.http.get(url)?;

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::storage(parent, e))?;
        }

        let written = write_body(url, response, destination);
        match written {
            Ok(bytes) => {
                info!(
                    "Downloaded {} ({} bytes) to {}",
                    url,
                    bytes,
                    destination.display()
                );
                Ok(bytes)
            }
            Err(e) => {
                remove_partial(destination);
                Err(e)
            }
        }
    }
}

fn write_body(url: &str, mut response: reqwest::blocking::Response, destination: &Path) -> Result<u64> {
    let mut file = File::create(destination).map_err(|e| Error::storage(destination, e))?;

    let bytes = response
        .copy_to(&mut file)
        .map_err(|e| transport_error(url, e))?;

    if let Some(expected) = response.content_length() {
        if bytes != expected {
            return Err(Error::Transport {
                url: url.to_string(),
                message: format!("transfer ended after {} of {} bytes", bytes, expected),
            });
        }
    }

    file.flush().map_err(|e| Error::storage(destination, e))?;
    file.sync_all().map_err(|e| Error::storage(destination, e))?;
    Ok(bytes)
}

pub(crate) fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to delete partial file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    #[test]
    fn test_unreachable_source_leaves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("driver.jar");
        fs::write(&destination, b"previous").unwrap();

        let downloader = Downloader::new(HttpSettings {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_secs(1),
            ..HttpSettings::default()
        });
        let err = downloader
            .download("http://127.0.0.1:9/driver.jar", &destination)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert_eq!(fs::read(&destination).unwrap(), b"previous");
    }

    #[test]
    fn test_remove_partial_ignores_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        remove_partial(&dir.path().join("missing.jar"));
    }
}
