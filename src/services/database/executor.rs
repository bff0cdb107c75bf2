//! SQL execution engine.
//!
//! Runs one statement on an owned connection:
//!
//! 1. lock the session for the whole sequence
//! 2. for a transactional request, remember the autocommit mode and switch
//!    to manual commit
//! 3. execute and decode the result set, or take the update count
//! 4. commit on success, roll back on any failure
//! 5. restore the remembered autocommit mode, whatever happened before
//!
//! Failures never escape as `Err`: they are captured in the returned
//! `SqlCommandResult`.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};

use super::command::{CommandData, SqlCommandRequest, SqlCommandResult};
use super::plugins::PluginRegistry;
use super::traits::{DatabaseSession, StatementOutcome, ValueDecoder};
use crate::error::{Error, Result};

/// Executes SQL commands, decoding values through the registry's decoders.
pub struct SqlExecutor {
    registry: Arc<PluginRegistry>,
}

impl SqlExecutor {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    /// Execute a request and report its normalized outcome.
    pub async fn execute(&self, request: &SqlCommandRequest) -> SqlCommandResult {
        let start = Instant::now();

        let decoder = match self.registry.value_decoder(request.dialect()).await {
            Ok(decoder) => decoder,
            Err(e) => return Self::failure(request, &e, start),
        };

        let mut session = request.handle().lock().await;

        let restore_mode = if request.need_transaction() {
            match session.autocommit().await {
                Ok(mode) => Some(mode),
                Err(e) => return Self::failure(request, &e, start),
            }
        } else {
            None
        };

        let outcome = Self::run(
            &mut **session,
            request.executed_sql(),
            decoder.as_ref(),
            restore_mode.is_some(),
        )
        .await;

        if let Some(mode) = restore_mode {
            if let Err(e) = session.set_autocommit(mode).await {
                error!("Failed to restore autocommit={} after statement: {}", mode, e);
            }
        }

        match outcome {
            Ok(data) => {
                let elapsed = start.elapsed().as_millis();
                debug!(
                    "Executed statement on {} in {}ms (database: {:?})",
                    request.dialect(),
                    elapsed,
                    request.database()
                );
                SqlCommandResult::succeeded(request, data, elapsed)
            }
            Err(e) => Self::failure(request, &e, start),
        }
    }

    async fn run(
        session: &mut dyn DatabaseSession,
        sql: &str,
        decoder: &dyn ValueDecoder,
        transactional: bool,
    ) -> Result<CommandData> {
        if transactional {
            session.set_autocommit(false).await?;
        }

        let result = match session.execute(sql).await {
            Ok(outcome) => decode_outcome(outcome, decoder),
            Err(e) => Err(e),
        };

        if !transactional {
            return result;
        }

        match result {
            Ok(data) => match session.commit().await {
                Ok(()) => Ok(data),
                Err(e) => {
                    rollback_quietly(session).await;
                    Err(e)
                }
            },
            Err(e) => {
                rollback_quietly(session).await;
                Err(e)
            }
        }
    }

    fn failure(request: &SqlCommandRequest, err: &Error, start: Instant) -> SqlCommandResult {
        debug!("Statement failed on {}: {}", request.dialect(), err);
        SqlCommandResult::failed(
            request,
            format!("{}: {}", err.name(), err),
            start.elapsed().as_millis(),
        )
    }
}

async fn rollback_quietly(session: &mut dyn DatabaseSession) {
    if let Err(e) = session.rollback().await {
        warn!("Rollback failed: {}", e);
    }
}

/// Decode every row of a result set, in the column order reported by the
/// dialect.
fn decode_outcome(outcome: StatementOutcome, decoder: &dyn ValueDecoder) -> Result<CommandData> {
    match outcome {
        StatementOutcome::ResultSet { columns, rows } => {
            let headers = columns.iter().map(|c| c.name.clone()).collect();
            let rows = rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .enumerate()
                        .map(|(i, col)| decoder.decode(row.as_ref(), i, col.sql_type, &col.type_name))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(CommandData::Query { headers, rows })
        }
        StatementOutcome::Affected(affected_rows) => Ok(CommandData::Affected { affected_rows }),
    }
}
