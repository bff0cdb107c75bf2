//! Database abstraction traits and types.
//!
//! This module provides the capability interfaces every dialect plugin
//! implements. It defines:
//!
//! - **Types** (`types`): Dialect identifiers and connection configuration
//! - **Row/Value** (`row`): Raw row access and the dialect-neutral `Value`
//! - **Connection** (`connection`): Sessions, the connectivity provider and session handles
//! - **Decoder** (`decoder`): Per-dialect value decoding
//! - **Provider** (`provider`): DDL export and script import
//!
//! # Example
//!
//! ```ignore
//! use sqlbridge::services::database::traits::{
//!     ConnectionConfig, ConnectionParams, Dialect,
//! };
//!
//! let config = ConnectionConfig::new(
//!     "Orders".to_string(),
//!     Dialect::MySQL,
//!     ConnectionParams::server(
//!         "localhost".to_string(),
//!         3306,
//!         "app".to_string(),
//!         "secret".to_string(),
//!         "orders".to_string(),
//!     ),
//! );
//! ```

pub mod connection;
pub mod decoder;
pub mod provider;
pub mod row;
pub mod types;

pub use connection::{
    BoxedSession, ConnectionProvider, DatabaseSession, SessionHandle, StatementOutcome,
};
pub use decoder::{ValueDecoder, decode_standard};
pub use provider::DatabaseProvider;
pub use row::{ColumnMeta, RawRow, SqlType, Value, to_hex_literal};
pub use types::{ConnectionConfig, ConnectionParams, Dialect, SslMode};
