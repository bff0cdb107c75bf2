//! Core database session traits.
//!
//! This module defines the `DatabaseSession` trait that every dialect's
//! connectivity provider hands out, the `ConnectionProvider` trait that
//! opens sessions, and `SessionHandle`, the shared handle through which a
//! session is used exclusively.

use async_lock::{Mutex, MutexGuard};
use async_trait::async_trait;
use std::sync::Arc;

use super::row::{ColumnMeta, RawRow};
use super::types::{ConnectionConfig, Dialect};
use crate::error::Result;

/// What the engine reported after executing one SQL text.
pub enum StatementOutcome {
    /// The statement produced a result set
    ResultSet {
        /// Column metadata, in the order reported by the dialect
        columns: Vec<ColumnMeta>,
        /// Fetched rows, not yet decoded
        rows: Vec<Box<dyn RawRow>>,
    },
    /// The statement produced an update count
    Affected(u64),
}

impl StatementOutcome {
    /// Whether the statement produced a result set
    pub fn is_query(&self) -> bool {
        matches!(self, StatementOutcome::ResultSet { .. })
    }
}

impl std::fmt::Debug for StatementOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementOutcome::ResultSet { columns, rows } => f
                .debug_struct("ResultSet")
                .field("columns", columns)
                .field("rows", &rows.len())
                .finish(),
            StatementOutcome::Affected(n) => f.debug_tuple("Affected").field(n).finish(),
        }
    }
}

/// One live, physical database connection.
///
/// Sessions are stateful (autocommit mode, current database), so a session
/// is never shared between concurrent operations; see `SessionHandle`.
#[async_trait]
pub trait DatabaseSession: Send {
    /// Get the dialect of this session
    fn dialect(&self) -> Dialect;

    /// Current autocommit mode.
    async fn autocommit(&mut self) -> Result<bool>;

    /// Switch autocommit mode.
    ///
    /// Switching from manual-commit to autocommit commits the open
    /// transaction, as JDBC-style drivers do.
    async fn set_autocommit(&mut self, enabled: bool) -> Result<()>;

    /// Commit the current transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Execute SQL text and report either its result set or its update count.
    ///
    /// Whether the statement is a query is decided by what the server
    /// returned, never by inspecting the SQL text.
    async fn execute(&mut self, sql: &str) -> Result<StatementOutcome>;

    /// Check if the session is still usable.
    async fn is_valid(&mut self) -> bool;

    /// Close the session and release server resources.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A boxed session trait object.
pub type BoxedSession = Box<dyn DatabaseSession>;

/// Opens sessions for one dialect.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Open a new physical connection.
    ///
    /// # Arguments
    ///
    /// * `config` - The saved connection definition
    /// * `database` - Database (catalog) to select, overriding the config's default
    /// * `schema` - Schema to select, for dialects that have schemas
    ///
    /// # Errors
    ///
    /// Returns a Connectivity error if the server cannot be reached or
    /// rejects the credentials.
    async fn connect(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
        schema: Option<&str>,
    ) -> Result<BoxedSession>;
}

/// Shared handle to a session.
///
/// Locking the handle grants exclusive use of the session, so a multi-step
/// sequence (autocommit toggle, execute, commit) can't interleave with
/// another operation on the same connection.
#[derive(Clone)]
pub struct SessionHandle {
    dialect: Dialect,
    inner: Arc<Mutex<BoxedSession>>,
}

impl SessionHandle {
    pub fn new(session: BoxedSession) -> Self {
        Self {
            dialect: session.dialect(),
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Acquire exclusive use of the session.
    pub async fn lock(&self) -> MutexGuard<'_, BoxedSession> {
        self.inner.lock().await
    }

    /// Whether two handles refer to the same session
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Close the session if this is its last handle.
    ///
    /// Returns `false` when other handles are still alive; the session then
    /// closes when the last of them is dropped.
    pub async fn close(self) -> Result<bool> {
        match Arc::try_unwrap(self.inner) {
            Ok(session) => {
                session.into_inner().close().await?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("dialect", &self.dialect)
            .field("session", &"<DatabaseSession>")
            .finish()
    }
}
