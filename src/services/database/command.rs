//! Request and result types of the SQL execution engine.

use serde::Serialize;

use super::traits::{Dialect, SessionHandle, Value};

/// One SQL statement to run against an owned connection.
///
/// Immutable once built. `original_sql` is what the caller submitted;
/// `executed_sql` is what actually runs (callers may rewrite it, e.g. to add
/// a row limit).
#[derive(Debug, Clone)]
pub struct SqlCommandRequest {
    handle: SessionHandle,
    original_sql: String,
    executed_sql: String,
    database: Option<String>,
    schema: Option<String>,
    need_transaction: bool,
}

impl SqlCommandRequest {
    pub fn new(handle: SessionHandle, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            handle,
            executed_sql: sql.clone(),
            original_sql: sql,
            database: None,
            schema: None,
            need_transaction: false,
        }
    }

    /// Run `sql` instead of the submitted text.
    pub fn with_executed_sql(mut self, sql: impl Into<String>) -> Self {
        self.executed_sql = sql.into();
        self
    }

    pub fn with_target(mut self, database: Option<String>, schema: Option<String>) -> Self {
        self.database = database;
        self.schema = schema;
        self
    }

    /// Wrap the statement in a transaction that commits on success.
    pub fn transactional(mut self, need_transaction: bool) -> Self {
        self.need_transaction = need_transaction;
        self
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn dialect(&self) -> Dialect {
        self.handle.dialect()
    }

    pub fn original_sql(&self) -> &str {
        &self.original_sql
    }

    pub fn executed_sql(&self) -> &str {
        &self.executed_sql
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn need_transaction(&self) -> bool {
        self.need_transaction
    }
}

/// Data returned by a successful statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandData {
    /// The statement produced a result set
    Query {
        headers: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// The statement produced an update count
    Affected { affected_rows: u64 },
}

/// Normalized outcome of one statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlCommandResult {
    pub success: bool,
    pub error_message: Option<String>,
    pub execution_time_ms: u128,
    pub original_sql: String,
    pub executed_sql: String,
    /// `None` exactly when the statement failed
    pub data: Option<CommandData>,
}

impl SqlCommandResult {
    pub(crate) fn succeeded(
        request: &SqlCommandRequest,
        data: CommandData,
        execution_time_ms: u128,
    ) -> Self {
        Self {
            success: true,
            error_message: None,
            execution_time_ms,
            original_sql: request.original_sql.clone(),
            executed_sql: request.executed_sql.clone(),
            data: Some(data),
        }
    }

    pub(crate) fn failed(
        request: &SqlCommandRequest,
        message: String,
        execution_time_ms: u128,
    ) -> Self {
        Self {
            success: false,
            error_message: Some(message),
            execution_time_ms,
            original_sql: request.original_sql.clone(),
            executed_sql: request.executed_sql.clone(),
            data: None,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self.data, Some(CommandData::Query { .. }))
    }

    pub fn headers(&self) -> Option<&[String]> {
        match &self.data {
            Some(CommandData::Query { headers, .. }) => Some(headers),
            _ => None,
        }
    }

    pub fn rows(&self) -> Option<&[Vec<Value>]> {
        match &self.data {
            Some(CommandData::Query { rows, .. }) => Some(rows),
            _ => None,
        }
    }

    pub fn affected_rows(&self) -> Option<u64> {
        match &self.data {
            Some(CommandData::Affected { affected_rows }) => Some(*affected_rows),
            _ => None,
        }
    }
}
