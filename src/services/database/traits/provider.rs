//! Database-level capability: DDL export and script import.

use async_trait::async_trait;

use super::connection::DatabaseSession;
use crate::error::Result;

/// Whole-database operations for one dialect.
#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    /// Export the DDL of a database: its own declaration followed by every
    /// table, view, trigger and routine.
    ///
    /// Reads metadata only.
    async fn export_database_ddl(
        &self,
        session: &mut dyn DatabaseSession,
        database: &str,
    ) -> Result<String>;

    /// Export one `CREATE TABLE` statement per base table, ordered by name.
    async fn export_all_table_ddls(
        &self,
        session: &mut dyn DatabaseSession,
        database: &str,
    ) -> Result<Vec<String>>;

    /// Execute a multi-statement script, statement by statement.
    ///
    /// Not atomic: statements before a failing one stay applied unless the
    /// caller runs the import inside a transaction.
    async fn execute_sql_script(&self, session: &mut dyn DatabaseSession, script: &str)
    -> Result<()>;
}
