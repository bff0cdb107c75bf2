//! PostgreSQL connectivity.
//!
//! PostgreSQL has no session-level autocommit switch, so `PostgresSession`
//! tracks the mode itself: in manual-commit mode the first statement opens a
//! transaction with `BEGIN`, and `COMMIT`/`ROLLBACK` close it. The session
//! holds a SQLx `PgPool` capped at one connection, so an open transaction
//! stays on the connection that began it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Executor, PgPool, Statement, TypeInfo};
use tracing::debug;

use super::types::{PgRawRow, column_meta, pg_sql_type};
use crate::error::{Error, Result};
use crate::services::database::drivers::first_result::{FirstResult, first_statement};
use crate::services::database::traits::{
    BoxedSession, ColumnMeta, ConnectionConfig, ConnectionProvider, DatabaseSession, Dialect,
    RawRow, SslMode, StatementOutcome,
};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens PostgreSQL sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnectionProvider;

impl PostgresConnectionProvider {
    /// Build PgConnectOptions from the configuration.
    ///
    /// A requested schema becomes the session's `search_path`.
    pub fn build_connect_options(
        config: &ConnectionConfig,
        database: Option<&str>,
        schema: Option<&str>,
    ) -> Result<PgConnectOptions> {
        config.validate()?;
        let params = &config.params;

        let ssl_mode = match params.ssl_mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
            SslMode::VerifyCa => PgSslMode::VerifyCa,
            SslMode::VerifyFull => PgSslMode::VerifyFull,
        };

        let mut options = PgConnectOptions::new()
            .host(&params.hostname)
            .port(params.port)
            .username(&params.username)
            .password(&params.password)
            .ssl_mode(ssl_mode);

        if let Some(db) = params.effective_database(database) {
            options = options.database(db);
        }
        if let Some(schema) = schema.filter(|s| !s.is_empty()) {
            options = options.options([("search_path", schema)]);
        }
        if let Some(name) = params.extra_options.get("application_name") {
            options = options.application_name(name);
        }
        Ok(options)
    }
}

#[async_trait]
impl ConnectionProvider for PostgresConnectionProvider {
    async fn connect(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
        schema: Option<&str>,
    ) -> Result<BoxedSession> {
        let options = Self::build_connect_options(config, database, schema)?;
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| Error::ConnectFailed(format!("{}: {}", config.name, e)))?;

        debug!(
            "Opened PostgreSQL session to {}:{}",
            config.params.hostname, config.params.port
        );
        Ok(Box::new(PostgresSession {
            pool,
            autocommit: true,
            in_transaction: false,
        }))
    }
}

/// A live PostgreSQL connection.
pub struct PostgresSession {
    pool: PgPool,
    autocommit: bool,
    in_transaction: bool,
}

impl std::fmt::Debug for PostgresSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSession")
            .field("pool", &"<PgPool>")
            .field("autocommit", &self.autocommit)
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl PostgresSession {
    async fn finish_transaction(&mut self, sql: &str) -> Result<()> {
        if self.in_transaction {
            // the transaction is over even if the server rejected the command
            self.in_transaction = false;
            sqlx::raw_sql(sql).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn describe_columns(&self, sql: &str) -> Option<Vec<ColumnMeta>> {
        let statement = (&self.pool).prepare(sql).await.ok()?;
        let columns: Vec<ColumnMeta> = statement
            .columns()
            .iter()
            .map(|col| {
                let type_name = col.type_info().name();
                ColumnMeta::new(col.name(), pg_sql_type(type_name), type_name)
            })
            .collect();
        (!columns.is_empty()).then_some(columns)
    }
}

#[async_trait]
impl DatabaseSession for PostgresSession {
    fn dialect(&self) -> Dialect {
        Dialect::PostgreSQL
    }

    async fn autocommit(&mut self) -> Result<bool> {
        Ok(self.autocommit)
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        if enabled && !self.autocommit {
            self.finish_transaction("COMMIT").await?;
        }
        self.autocommit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.finish_transaction("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<()> {
        self.finish_transaction("ROLLBACK").await
    }

    async fn execute(&mut self, sql: &str) -> Result<StatementOutcome> {
        if !self.autocommit && !self.in_transaction {
            sqlx::raw_sql("BEGIN").execute(&self.pool).await?;
            self.in_transaction = true;
        }

        let mut first: FirstResult<PgRow> = FirstResult::default();
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
                .map(|row| PgRawRow::from_row(row).map(|r| Box::new(r) as Box<dyn RawRow>))
                .collect::<Result<Vec<_>>>()?;
            return Ok(StatementOutcome::ResultSet {
                columns: columns.as_ref().clone(),
                rows: raw_rows,
            });
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::traits::ConnectionParams;

    fn create_test_config() -> ConnectionConfig {
        ConnectionConfig::new(
            "test".to_string(),
            Dialect::PostgreSQL,
            ConnectionParams::server(
                "localhost".to_string(),
                5432,
                "postgres".to_string(),
                "password".to_string(),
                "app".to_string(),
            ),
        )
    }

    #[test]
    fn test_build_connect_options() {
        let config = create_test_config();
        let options =
            PostgresConnectionProvider::build_connect_options(&config, None, Some("audit"))
                .unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "postgres");
        assert_eq!(options.get_database(), Some("app"));
    }

    #[test]
    fn test_requested_database_overrides_default() {
        let config = create_test_config();
        let options =
            PostgresConnectionProvider::build_connect_options(&config, Some("reports"), None)
                .unwrap();
        assert_eq!(options.get_database(), Some("reports"));
    }

    #[test]
    fn test_unreachable_server_is_a_connectivity_error() {
        let mut config = create_test_config();
        config.params.hostname = "127.0.0.1".to_string();
        config.params.port = 9;
        config.params.ssl_mode = SslMode::Disable;

        let err = smol::block_on(PostgresConnectionProvider.connect(&config, None, None))
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Connectivity);
    }
}
