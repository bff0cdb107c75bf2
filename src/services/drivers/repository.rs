//! Remote package repository protocol.
//!
//! Artifacts and their metadata live at predictable paths:
//!
//! ```text
//! {base}/{group/as/path}/{artifact}/maven-metadata.xml
//! {base}/{group/as/path}/{artifact}/{version}/{artifact}-{version}.jar
//! ```

use tracing::debug;

use super::coordinates::PackageCoordinates;
use super::http::HttpSettings;
use super::version::sort_newest_first;
use crate::error::{Error, Result};

pub const DEFAULT_REPOSITORY_URL: &str = "https://repo1.maven.org/maven2";
pub const ARCHIVE_EXTENSION: &str = "jar";

const METADATA_FILE: &str = "maven-metadata.xml";

fn group_path(group_id: &str) -> String {
    group_id.replace('.', "/")
}

/// URL of the artifact identified by `coords`.
pub fn build_download_url(coords: &PackageCoordinates, base_url: &str) -> Result<String> {
    coords.ensure_complete()?;
    Ok(format!(
        "{}/{}/{}/{}/{}-{}.{}",
        base_url.trim_end_matches('/'),
        group_path(&coords.group_id),
        coords.artifact_id,
        coords.version,
        coords.artifact_id,
        coords.version,
        ARCHIVE_EXTENSION
    ))
}

/// URL of the version index of an artifact.
pub fn build_metadata_url(group_id: &str, artifact_id: &str, base_url: &str) -> Result<String> {
    if group_id.trim().is_empty() || artifact_id.trim().is_empty() {
        return Err(Error::IncompleteCoordinates(format!(
            "{}:{}",
            group_id, artifact_id
        )));
    }
    Ok(format!(
        "{}/{}/{}/{}",
        base_url.trim_end_matches('/'),
        group_path(group_id),
        artifact_id,
        METADATA_FILE
    ))
}

/// Recover the coordinates from an artifact URL produced by
/// [`build_download_url`] against the same base.
pub fn parse_download_url(url: &str, base_url: &str) -> Result<PackageCoordinates> {
    let invalid = |reason: &str| Error::InvalidConfig(format!("{}: {}", url, reason));

    let parsed = url::Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    let base = url::Url::parse(base_url.trim_end_matches('/'))
        .map_err(|e| Error::InvalidConfig(format!("{}: {}", base_url, e)))?;

    if parsed.origin() != base.origin() {
        return Err(invalid("not under the repository base URL"));
    }

    let base_segments: Vec<&str> = base
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let relative = segments
        .strip_prefix(base_segments.as_slice())
        .ok_or_else(|| invalid("not under the repository base URL"))?;

    // at least one group segment, then artifact, version and file name
    let [group @ .., artifact, version, file] = relative else {
        return Err(invalid("not an artifact path"));
    };
    if group.is_empty() {
        return Err(invalid("missing group"));
    }

    let expected = format!("{}-{}.{}", artifact, version, ARCHIVE_EXTENSION);
    if *file != expected {
        return Err(invalid("file name does not match artifact and version"));
    }

    Ok(PackageCoordinates::new(group.join("."), *artifact, *version))
}

/// Extract every non-empty `<version>` from a metadata document, newest first.
pub fn parse_metadata_versions(xml: &str) -> Result<Vec<String>> {
    let document =
        roxmltree::Document::parse(xml).map_err(|e| Error::MetadataParse(e.to_string()))?;

    let mut versions: Vec<String> = document
        .descendants()
        .filter(|node| node.has_tag_name("version"))
        .filter_map(|node| node.text())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    sort_newest_first(&mut versions);
    versions.dedup();
    Ok(versions)
}

/// Client for the version index of a remote repository.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    base_url: String,
    http: HttpSettings,
}

impl MetadataClient {
    pub fn new(base_url: impl Into<String>, http: HttpSettings) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch all published versions of an artifact, newest first.
    ///
    /// # Errors
    ///
    /// Connectivity errors for empty identifiers, non-200 responses,
    /// transport failures and unparseable metadata.
    pub fn fetch_versions(&self, group_id: &str, artifact_id: &str) -> Result<Vec<String>> {
        let url = build_metadata_url(group_id, artifact_id, &self.base_url).map_err(|e| {
            Error::Transport {
                url: self.base_url.clone(),
                message: e.to_string(),
            }
        })?;

        debug!("Fetching repository metadata from {}", url);
        let body = self
            .http
            .get(&url)?
            .text()
            .map_err(|e| super::http::transport_error(&url, e))?;

        parse_metadata_versions(&body)
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new(DEFAULT_REPOSITORY_URL, HttpSettings::default())
    }
}
