//! Multi-dialect SQL gateway.
//!
//! Resolves dialect plugins from a registry, downloads and caches vendor
//! drivers from a Maven-style repository, owns live connections per user
//! and executes statements with uniform, dialect-neutral results.

pub mod config;
pub mod error;
pub mod logging;
pub mod services;

pub use config::CoreConfig;
pub use error::{Error, ErrorKind, Result};
pub use services::SqlBridge;
