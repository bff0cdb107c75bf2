use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::services::database::traits::Dialect;

/// Stable classification of every failure the core can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Configuration,
    Connectivity,
    Integrity,
    Ownership,
    Capability,
    Execution,
    Storage,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIGURATION",
            ErrorKind::Connectivity => "CONNECTIVITY",
            ErrorKind::Integrity => "INTEGRITY",
            ErrorKind::Ownership => "OWNERSHIP",
            ErrorKind::Capability => "CAPABILITY",
            ErrorKind::Execution => "EXECUTION",
            ErrorKind::Storage => "STORAGE",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown database type: {0}")]
    UnknownDialect(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("incomplete package coordinates: {0}")]
    IncompleteCoordinates(String),

    #[error("no plugin supports driver version {version} for database type {dialect}")]
    UnsupportedDriverVersion { dialect: Dialect, version: String },

    #[error("driver not installed: {dialect}/{version}")]
    DriverNotInstalled { dialect: Dialect, version: String },

    #[error("connection config not found: {0}")]
    ConnectionConfigNotFound(String),

    #[error("connection not open: {0}")]
    ConnectionNotOpen(String),

    #[error("request to {url} failed: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("failed to parse repository metadata: {0}")]
    MetadataParse(String),

    #[error("failed to connect: {0}")]
    ConnectFailed(String),

    #[error("invalid driver archive {path}: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("connection {key} is owned by another user")]
    OwnershipViolation { key: String },

    #[error("no plugin registered for database type {0}")]
    PluginNotFound(Dialect),

    #[error("plugin for {dialect} does not support {capability}")]
    CapabilityNotSupported {
        dialect: Dialect,
        capability: &'static str,
    },

    #[error("{0}")]
    Execution(String),

    #[error("storage error at {path}: {message}")]
    Storage { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownDialect(_)
            | Error::InvalidConfig(_)
            | Error::IncompleteCoordinates(_)
            | Error::UnsupportedDriverVersion { .. }
            | Error::DriverNotInstalled { .. }
            | Error::ConnectionConfigNotFound(_)
            | Error::ConnectionNotOpen(_) => ErrorKind::Configuration,
            Error::HttpStatus { .. }
            | Error::Transport { .. }
            | Error::MetadataParse(_)
            | Error::ConnectFailed(_) => ErrorKind::Connectivity,
            Error::InvalidArchive { .. } => ErrorKind::Integrity,
            Error::OwnershipViolation { .. } => ErrorKind::Ownership,
            Error::PluginNotFound(_) | Error::CapabilityNotSupported { .. } => {
                ErrorKind::Capability
            }
            Error::Execution(_) => ErrorKind::Execution,
            Error::Storage { .. } | Error::Io(_) => ErrorKind::Storage,
        }
    }

    /// Short type-like name used when a failure is rendered into a result
    /// object, e.g. `ExecutionError: Duplicate entry '1' for key 'PRIMARY'`.
    pub fn name(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Connectivity => "ConnectivityError",
            ErrorKind::Integrity => "IntegrityError",
            ErrorKind::Ownership => "OwnershipError",
            ErrorKind::Capability => "CapabilityError",
            ErrorKind::Execution => "ExecutionError",
            ErrorKind::Storage => "StorageError",
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Error::Storage {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidArchive {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => Error::Execution(db.message().to_string()),
            other => Error::Execution(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
