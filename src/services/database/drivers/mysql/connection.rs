//! MySQL connectivity.
//!
//! Each session owns a SQLx `MySqlPool` capped at one connection, so that
//! session state such as `autocommit` stays on the same server connection.
//! Statements are sent over the text protocol so that any SQL the server
//! accepts, including multi-statement text and vendor extensions, can be
//! executed without classifying it first.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Executor, MySqlPool, Row, Statement, TypeInfo};
use tracing::debug;

use super::types::{MySqlRawRow, column_meta, mysql_sql_type};
use crate::error::{Error, Result};
use crate::services::database::drivers::first_result::{FirstResult, first_statement};
use crate::services::database::traits::{
    BoxedSession, ColumnMeta, ConnectionConfig, ConnectionProvider, DatabaseSession, Dialect,
    RawRow, SslMode, StatementOutcome,
};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens MySQL sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnectionProvider;

impl MySqlConnectionProvider {
    /// Build MySqlConnectOptions from the configuration.
    ///
    /// MySQL has no schemas below databases, so a requested schema selects
    /// the database when no database is given.
    pub fn build_connect_options(
        config: &ConnectionConfig,
        database: Option<&str>,
        schema: Option<&str>,
    ) -> Result<MySqlConnectOptions> {
        config.validate()?;
        let params = &config.params;

        let ssl_mode = match params.ssl_mode {
            SslMode::Disable => MySqlSslMode::Disabled,
            SslMode::Prefer => MySqlSslMode::Preferred,
            SslMode::Require => MySqlSslMode::Required,
            SslMode::VerifyCa => MySqlSslMode::VerifyCa,
            SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
        };

        let mut options = MySqlConnectOptions::new()
            .host(&params.hostname)
            .port(params.port)
            .username(&params.username)
            .password(&params.password)
            .ssl_mode(ssl_mode);

        if let Some(db) = params.effective_database(database.or(schema)) {
            options = options.database(db);
        }
        if let Some(charset) = params.extra_options.get("charset") {
            options = options.charset(charset);
        }
        Ok(options)
    }
}

#[async_trait]
impl ConnectionProvider for MySqlConnectionProvider {
    async fn connect(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
        schema: Option<&str>,
    ) -> Result<BoxedSession> {
        let options = Self::build_connect_options(config, database, schema)?;
        // one connection that is never recycled: autocommit is per connection
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| Error::ConnectFailed(format!("{}: {}", config.name, e)))?;

        debug!(
            "Opened MySQL session to {}:{}",
            config.params.hostname, config.params.port
        );
        Ok(Box::new(MySqlSession { pool }))
    }
}

/// A live MySQL connection.
pub struct MySqlSession {
    pool: MySqlPool,
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSession")
            .field("pool", &"<MySqlPool>")
            .finish()
    }
}

impl MySqlSession {
    /// Describe a statement without running it, to learn whether it
    /// produces a result set.
    async fn describe_columns(&self, sql: &str) -> Option<Vec<ColumnMeta>> {
        let statement = (&self.pool).prepare(sql).await.ok()?;
        let columns: Vec<ColumnMeta> = statement
            .columns()
            .iter()
            .map(|col| {
                let type_name = col.type_info().name();
                ColumnMeta::new(col.name(), mysql_sql_type(type_name), type_name)
            })
            .collect();
        (!columns.is_empty()).then_some(columns)
    }
}

#[async_trait]
impl DatabaseSession for MySqlSession {
    fn dialect(&self) -> Dialect {
        Dialect::MySQL
    }

    async fn autocommit(&mut self) -> Result<bool> {
        let row = sqlx::query("SELECT @@autocommit")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get_unchecked::<i64, _>(0)? != 0)
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        let sql = if enabled {
            "SET autocommit = 1"
        } else {
            "SET autocommit = 0"
        };
        sqlx::raw_sql(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        sqlx::raw_sql("COMMIT").execute(&self.pool).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        sqlx::raw_sql("ROLLBACK").execute(&self.pool).await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<StatementOutcome> {
        let mut first: FirstResult<MySqlRow> = FirstResult::default();
        {
            let mut stream = sqlx::raw_sql(sql).fetch_many(&self.pool);
            while let Some(item) = stream.try_next().await? {
                first.accept(item.map_left(|done| done.rows_affected()));
            }
        }

        if let Some(head) = first.rows().first() {
            let columns = Arc::new(column_meta(head));
            let raw_rows = first
                .rows()
                .iter()
                .map(|row| {
                    MySqlRawRow::from_row(columns.clone(), row).map(|r| Box::new(r) as Box<dyn RawRow>)
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(StatementOutcome::ResultSet {
                columns: columns.as_ref().clone(),
                rows: raw_rows,
            });
        }

        // an empty result set is indistinguishable from an update count on
        // the wire; the description of the first statement tells them apart
        let described = match first_statement(sql) {
            Some(statement) => self.describe_columns(&statement).await,
            None => None,
        };
        match described {
            Some(columns) => Ok(StatementOutcome::ResultSet {
                columns,
                rows: Vec::new(),
            }),
            None => Ok(StatementOutcome::Affected(first.affected())),
        }
    }

    async fn is_valid(&mut self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
