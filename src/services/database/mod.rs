//! Multi-dialect database core.
//!
//! - **Traits** (`traits`): capability interfaces and dialect-neutral types
//! - **Plugins** (`plugins`): the dialect → capability registry
//! - **Drivers** (`drivers`): built-in MySQL and PostgreSQL plugins
//! - **Manager** (`manager`): live connections and their owners
//! - **Executor** (`executor`): transactional execution of one statement
//! - **Script** (`script`): multi-statement script splitting and import

pub mod command;
pub mod drivers;
pub mod executor;
pub mod manager;
pub mod plugins;
pub mod script;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use command::{CommandData, SqlCommandRequest, SqlCommandResult};
pub use executor::SqlExecutor;
pub use manager::{
    ConnectionConfigSource, ConnectionKey, ConnectionManager, InMemoryConfigSource,
    OwnedConnection, UserId,
};
pub use plugins::{PluginDescriptor, PluginRegistry};
pub use script::{run_script, split_statements};
