//! MySQL dialect plugin.
//!
//! Connectivity and decoding use SQLx over the text protocol; DDL export
//! and import are built on the server's `SHOW CREATE` statements.
//!
//! # Example
//!
//! ```ignore
//! use sqlbridge::services::database::drivers::mysql;
//!
//! registry.register(mysql::plugin()?).await;
//! ```

mod connection;
mod schema;
mod types;

use std::sync::Arc;

pub use connection::{MySqlConnectionProvider, MySqlSession};
pub use schema::{MySqlDatabaseProvider, quote_identifier, quote_literal};
pub use types::{MySqlRawRow, MySqlValueDecoder, mysql_sql_type};

use crate::error::Result;
use crate::services::database::plugins::PluginDescriptor;
use crate::services::database::traits::Dialect;
use crate::services::drivers::{DriverSpec, PackageCoordinates};

pub const PLUGIN_ID: &str = "mysql";

/// Connector/J coordinates of the default driver.
pub fn driver_spec() -> Result<DriverSpec> {
    DriverSpec::new(
        PackageCoordinates::new("com.mysql", "mysql-connector-j", "8.0.33"),
        ">=8.0.31",
    )
}

/// The MySQL plugin with every capability.
pub fn plugin() -> Result<PluginDescriptor> {
    Ok(PluginDescriptor::new(PLUGIN_ID, Dialect::MySQL)
        .with_driver(driver_spec()?)
        .with_connection_provider(Arc::new(MySqlConnectionProvider))
        .with_value_decoder(Arc::new(MySqlValueDecoder))
        .with_database_provider(Arc::new(MySqlDatabaseProvider)))
}
