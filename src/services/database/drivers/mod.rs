//! Built-in dialect plugins.
//!
//! - **MySQL**: connectivity, value decoding, DDL export and script import
//! - **PostgreSQL**: connectivity and value decoding
//!
//! Each plugin module exposes a `plugin()` constructor returning its
//! `PluginDescriptor`; `builtin_plugins` collects them for registration.

mod first_result;
pub mod mysql;
pub mod postgres;

use crate::error::Result;
use crate::services::database::plugins::PluginDescriptor;

/// Descriptors of every plugin compiled into the crate.
pub fn builtin_plugins() -> Result<Vec<PluginDescriptor>> {
    Ok(vec![mysql::plugin()?, postgres::plugin()?])
}
