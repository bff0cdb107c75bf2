//! PostgreSQL dialect plugin.
//!
//! Provides connectivity and value decoding. DDL export is not implemented
//! for PostgreSQL, so the registry reports that capability as unsupported.

mod connection;
mod types;

use std::sync::Arc;

pub use connection::{PostgresConnectionProvider, PostgresSession};
pub use types::{PgRawRow, PgValueDecoder, parse_array_literal, pg_sql_type};

use crate::error::Result;
use crate::services::database::plugins::PluginDescriptor;
use crate::services::database::traits::Dialect;
use crate::services::drivers::{DriverSpec, PackageCoordinates};

pub const PLUGIN_ID: &str = "postgresql";

/// pgJDBC coordinates of the default driver.
pub fn driver_spec() -> Result<DriverSpec> {
    DriverSpec::new(
        PackageCoordinates::new("org.postgresql", "postgresql", "42.7.2"),
        ">=42",
    )
}

pub fn plugin() -> Result<PluginDescriptor> {
    Ok(PluginDescriptor::new(PLUGIN_ID, Dialect::PostgreSQL)
        .with_driver(driver_spec()?)
        .with_connection_provider(Arc::new(PostgresConnectionProvider))
        .with_value_decoder(Arc::new(PgValueDecoder)))
}
