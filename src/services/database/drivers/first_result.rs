//! First-result tracking for text-protocol executions.
//!
//! A statement text may produce several results (multi-statement text,
//! stored procedure calls). Only the first one is reported, and it alone
//! decides between a result set and an update count.

use sqlx::Either;

use crate::services::database::script::split_statements;

/// Rows and update count of the first result of an execution.
#[derive(Debug)]
pub(crate) struct FirstResult<R> {
    rows: Vec<R>,
    affected: Option<u64>,
}

impl<R> Default for FirstResult<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            affected: None,
        }
    }
}

impl<R> FirstResult<R> {
    /// Feed the next stream item: a completed result's affected count, or a row.
    ///
    /// Everything after the first completed result is ignored.
    pub fn accept(&mut self, item: Either<u64, R>) {
        if self.affected.is_some() {
            return;
        }
        match item {
            Either::Left(count) => self.affected = Some(count),
            Either::Right(row) => self.rows.push(row),
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn affected(&self) -> u64 {
        self.affected.unwrap_or(0)
    }
}

/// The statement that produced the first result of `sql`.
///
/// An empty first result carries no column list on the wire; describing
/// this statement tells an empty result set from an update count.
pub(crate) fn first_statement(sql: &str) -> Option<String> {
    split_statements(sql).into_iter().next()
}
