//! MySQL DDL export and script import.
//!
//! Export reads `information_schema` and the server's own `SHOW CREATE`
//! output, so the DDL is exactly what the server would dump. Triggers and
//! routines are wrapped in `DELIMITER ;;` blocks so the export can be fed
//! back through script import.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::services::database::script::run_script;
use crate::services::database::traits::{DatabaseProvider, DatabaseSession, StatementOutcome};

/// DDL export and script import for MySQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDatabaseProvider;

/// Quote an identifier with backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render a string literal for text-protocol SQL.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

impl MySqlDatabaseProvider {
    /// Run a metadata query and collect rows as optional strings.
    async fn query_rows(
        session: &mut dyn DatabaseSession,
        sql: &str,
    ) -> Result<Vec<Vec<Option<String>>>> {
        match session.execute(sql).await? {
            StatementOutcome::ResultSet { rows, .. } => rows
                .iter()
                .map(|row| {
                    (0..row.len())
                        .map(|i| row.get_string(i))
                        .collect::<Result<Vec<_>>>()
                })
                .collect(),
            StatementOutcome::Affected(_) => Err(Error::Execution(format!(
                "metadata query returned no result set: {}",
                sql
            ))),
        }
    }

    /// Run a `SHOW CREATE ...` statement and return one column of its single row.
    async fn show_create(
        session: &mut dyn DatabaseSession,
        sql: &str,
        column: usize,
    ) -> Result<Option<String>> {
        let rows = Self::query_rows(session, sql).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|mut row| (column < row.len()).then(|| row.swap_remove(column)))
            .flatten())
    }

    /// `(name, type)` pairs of the database's tables and views, by name.
    async fn list_tables(
        session: &mut dyn DatabaseSession,
        database: &str,
    ) -> Result<Vec<(String, String)>> {
        let sql = format!(
            "SELECT TABLE_NAME, TABLE_TYPE FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = {} ORDER BY TABLE_NAME",
            quote_literal(database)
        );
        Ok(Self::query_rows(session, &sql)
            .await?
            .into_iter()
            .filter_map(|row| match row.as_slice() {
                [Some(name), Some(kind), ..] => Some((name.clone(), kind.clone())),
                _ => None,
            })
            .collect())
    }

    async fn table_ddl(
        session: &mut dyn DatabaseSession,
        database: &str,
        table: &str,
    ) -> Result<Option<String>> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_identifier(database),
            quote_identifier(table)
        );
        Self::show_create(session, &sql, 1).await
    }

    async fn export_triggers(
        session: &mut dyn DatabaseSession,
        database: &str,
        out: &mut String,
    ) -> Result<()> {
        let sql = format!(
            "SELECT TRIGGER_NAME FROM information_schema.TRIGGERS \
             WHERE TRIGGER_SCHEMA = {} ORDER BY TRIGGER_NAME",
            quote_literal(database)
        );
        let names: Vec<String> = Self::query_rows(session, &sql)
            .await?
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect();

        for name in names {
            let sql = format!(
                "SHOW CREATE TRIGGER {}.{}",
                quote_identifier(database),
                quote_identifier(&name)
            );
            match Self::show_create(session, &sql, 2).await? {
                Some(ddl) => push_compound(out, "Trigger", &name, &ddl),
                None => warn!("No definition visible for trigger {}.{}", database, name),
            }
        }
        Ok(())
    }

    async fn export_routines(
        session: &mut dyn DatabaseSession,
        database: &str,
        out: &mut String,
    ) -> Result<()> {
        let sql = format!(
            "SELECT ROUTINE_NAME, ROUTINE_TYPE FROM information_schema.ROUTINES \
             WHERE ROUTINE_SCHEMA = {} ORDER BY ROUTINE_TYPE, ROUTINE_NAME",
            quote_literal(database)
        );
        let routines: Vec<(String, String)> = Self::query_rows(session, &sql)
            .await?
            .into_iter()
            .filter_map(|row| match row.as_slice() {
                [Some(name), Some(kind), ..] => Some((name.clone(), kind.to_uppercase())),
                _ => None,
            })
            .collect();

        for (name, kind) in routines {
            let (label, statement) = match kind.as_str() {
                "PROCEDURE" => ("Procedure", "PROCEDURE"),
                "FUNCTION" => ("Function", "FUNCTION"),
                other => {
                    debug!("Skipping routine {} of type {}", name, other);
                    continue;
                }
            };
            let sql = format!(
                "SHOW CREATE {} {}.{}",
                statement,
                quote_identifier(database),
                quote_identifier(&name)
            );
            // NULL without the privilege to read the body
            match Self::show_create(session, &sql, 2).await? {
                Some(ddl) => push_compound(out, label, &name, &ddl),
                None => warn!("No definition visible for {} {}.{}", label, database, name),
            }
        }
        Ok(())
    }
}

fn push_statement(out: &mut String, label: &str, name: &str, ddl: &str) {
    out.push_str(&format!("-- {}: {}\n{};\n\n", label, name, ddl.trim_end()));
}

fn push_compound(out: &mut String, label: &str, name: &str, ddl: &str) {
    out.push_str(&format!(
        "-- {}: {}\nDELIMITER ;;\n{} ;;\nDELIMITER ;\n\n",
        label,
        name,
        ddl.trim_end()
    ));
}

#[async_trait]
impl DatabaseProvider for MySqlDatabaseProvider {
    async fn export_database_ddl(
        &self,
        session: &mut dyn DatabaseSession,
        database: &str,
    ) -> Result<String> {
        let mut out = String::new();
        let quoted = quote_identifier(database);

        let create = Self::show_create(session, &format!("SHOW CREATE DATABASE {}", quoted), 1)
            .await?
            .ok_or_else(|| Error::Execution(format!("Unknown database '{}'", database)))?;
        out.push_str(&format!("{};\n\nUSE {};\n\n", create.trim_end(), quoted));

        let objects = Self::list_tables(session, database).await?;
        for (name, _) in objects.iter().filter(|(_, kind)| kind == "BASE TABLE") {
            if let Some(ddl) = Self::table_ddl(session, database, name).await? {
                push_statement(&mut out, "Table", name, &ddl);
            }
        }
        for (name, _) in objects.iter().filter(|(_, kind)| kind == "VIEW") {
            let sql = format!("SHOW CREATE VIEW {}.{}", quoted, quote_identifier(name));
            if let Some(ddl) = Self::show_create(session, &sql, 1).await? {
                push_statement(&mut out, "View", name, &ddl);
            }
        }

        Self::export_triggers(session, database, &mut out).await?;
        Self::export_routines(session, database, &mut out).await?;

        Ok(out)
    }

    async fn export_all_table_ddls(
        &self,
        session: &mut dyn DatabaseSession,
        database: &str,
    ) -> Result<Vec<String>> {
        let mut ddls = Vec::new();
        for (name, kind) in Self::list_tables(session, database).await? {
            if kind != "BASE TABLE" {
                continue;
            }
            if let Some(ddl) = Self::table_ddl(session, database, &name).await? {
                ddls.push(ddl);
            }
        }
        Ok(ddls)
    }

    async fn execute_sql_script(
        &self,
        session: &mut dyn DatabaseSession,
        script: &str,
    ) -> Result<()> {
        run_script(session, script).await.map(|_| ())
    }
}
