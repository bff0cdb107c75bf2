//! Dialect identifiers and connection configuration.
//!
//! This module contains:
//! - `Dialect` - The closed set of database engine families the core knows about
//! - `ConnectionConfig` - A saved connection definition, addressed by id
//! - `ConnectionParams` - Server connection parameters

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Supported database dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    MySQL,
    PostgreSQL,
}

impl Dialect {
    /// Canonical lowercase code, used in requests and configuration
    pub fn code(&self) -> &'static str {
        match self {
            Self::MySQL => "mysql",
            Self::PostgreSQL => "postgresql",
        }
    }

    /// Display name, also used as the driver storage subdirectory
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySQL => "MySQL",
            Self::PostgreSQL => "PostgreSQL",
        }
    }

    /// Get the default server port
    pub fn default_port(&self) -> u16 {
        match self {
            Self::MySQL => 3306,
            Self::PostgreSQL => 5432,
        }
    }

    /// Get all known dialects
    pub fn all() -> Vec<Dialect> {
        vec![Self::MySQL, Self::PostgreSQL]
    }

    /// Parse a dialect code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownDialect` for anything that is not a known code or alias.
    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim().to_lowercase().as_str() {
            "mysql" => Ok(Self::MySQL),
            "postgresql" | "postgres" | "pg" => Ok(Self::PostgreSQL),
            _ => Err(Error::UnknownDialect(code.to_string())),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// SSL mode options (generic across databases)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SslMode {
    /// No SSL connection
    Disable,
    /// Try SSL first, fall back to non-SSL
    #[default]
    Prefer,
    /// Require SSL, don't verify certificates
    Require,
    /// Require SSL and verify server certificate
    VerifyCa,
    /// Require SSL, verify certificate and hostname
    VerifyFull,
}

/// A saved connection definition.
///
/// The persistence of these records belongs to the surrounding application;
/// the core only reads them through a `ConnectionConfigSource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Unique identifier for this connection
    pub id: Uuid,
    /// User-friendly name for this connection
    pub name: String,
    /// The database dialect
    pub dialect: Dialect,
    /// Connection parameters
    pub params: ConnectionParams,
}

impl ConnectionConfig {
    /// Create a new connection configuration
    pub fn new(name: String, dialect: Dialect, params: ConnectionParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            dialect,
            params,
        }
    }

    /// Create a new connection configuration with a specific ID
    pub fn with_id(id: Uuid, name: String, dialect: Dialect, params: ConnectionParams) -> Self {
        Self {
            id,
            name,
            dialect,
            params,
        }
    }

    /// Check the parameters are usable before a connect is attempted
    pub fn validate(&self) -> Result<()> {
        if self.params.hostname.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{}: hostname is required",
                self.name
            )));
        }
        if self.params.username.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{}: username is required",
                self.name
            )));
        }
        Ok(())
    }
}

/// Server connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Server hostname or IP address
    pub hostname: String,
    /// Server port
    pub port: u16,
    /// Username for authentication
    pub username: String,
    /// Password for authentication
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Default database to connect to, empty for none
    #[serde(default)]
    pub database: String,
    /// SSL mode for the connection
    #[serde(default)]
    pub ssl_mode: SslMode,
    /// Additional driver-specific options
    #[serde(default)]
    pub extra_options: HashMap<String, String>,
}

impl ConnectionParams {
    /// Create new server connection parameters
    pub fn server(
        hostname: String,
        port: u16,
        username: String,
        password: String,
        database: String,
    ) -> Self {
        Self {
            hostname,
            port,
            username,
            password,
            database,
            ssl_mode: SslMode::default(),
            extra_options: HashMap::new(),
        }
    }

    /// The database to use, preferring an explicit override
    pub fn effective_database<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .filter(|d| !d.is_empty())
            .or_else(|| Some(self.database.as_str()).filter(|d| !d.is_empty()))
    }
}
