//! Scripted in-memory sessions for engine, manager and provider tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::traits::decoder::testing::TextRow;
use super::traits::{
    BoxedSession, ColumnMeta, ConnectionConfig, ConnectionProvider, DatabaseSession, Dialect,
    RawRow, SqlType, StatementOutcome,
};
use crate::error::{Error, Result};

/// A canned reply to a statement.
#[derive(Debug, Clone)]
pub enum Reply {
    Rows {
        columns: Vec<ColumnMeta>,
        rows: Vec<Vec<Option<String>>>,
    },
    Affected(u64),
    Fail(String),
}

impl Reply {
    /// A result set whose columns are all `VARCHAR`.
    pub fn text_rows(columns: &[&str], rows: &[&[Option<&str>]]) -> Self {
        Reply::Rows {
            columns: columns
                .iter()
                .map(|c| ColumnMeta::new(*c, SqlType::VarChar, "VARCHAR"))
                .collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }
}

/// Observable state of a scripted session.
#[derive(Debug, Default)]
pub struct SessionState {
    pub autocommit: bool,
    pub executed: Vec<String>,
    pub commits: usize,
    pub rollbacks: usize,
    pub closed: bool,
    pub fail_commit: bool,
    pub fail_restore: bool,
}

/// A session that answers statements from a list of `(prefix, reply)`
/// pairs. Unmatched statements report zero affected rows.
pub struct ScriptedSession {
    dialect: Dialect,
    replies: Vec<(String, Reply)>,
    state: Arc<Mutex<SessionState>>,
}

impl ScriptedSession {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            replies: Vec::new(),
            state: Arc::new(Mutex::new(SessionState {
                autocommit: true,
                ..SessionState::default()
            })),
        }
    }

    pub fn reply(mut self, prefix: &str, reply: Reply) -> Self {
        self.replies.push((prefix.to_string(), reply));
        self
    }

    pub fn state(&self) -> Arc<Mutex<SessionState>> {
        self.state.clone()
    }

    pub fn boxed(self) -> BoxedSession {
        Box::new(self)
    }
}

#[async_trait]
impl DatabaseSession for ScriptedSession {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn autocommit(&mut self) -> Result<bool> {
        Ok(self.state.lock().unwrap().autocommit)
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if enabled && state.fail_restore {
            return Err(Error::Execution("cannot restore autocommit".to_string()));
        }
        state.autocommit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_commit {
            return Err(Error::Execution("commit failed".to_string()));
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.state.lock().unwrap().rollbacks += 1;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<StatementOutcome> {
        self.state.lock().unwrap().executed.push(sql.to_string());

        let reply = self
            .replies
            .iter()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Affected(0));

        match reply {
            Reply::Rows { columns, rows } => Ok(StatementOutcome::ResultSet {
                columns,
                rows: rows
                    .into_iter()
                    .map(|cells| Box::new(TextRow(cells)) as Box<dyn RawRow>)
                    .collect(),
            }),
            Reply::Affected(n) => Ok(StatementOutcome::Affected(n)),
            Reply::Fail(message) => Err(Error::Execution(message)),
        }
    }

    async fn is_valid(&mut self) -> bool {
        !self.state.lock().unwrap().closed
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Connection provider handing out scripted sessions, counting opens.
#[derive(Default)]
pub struct ScriptedProvider {
    pub opened: Mutex<Vec<(Option<String>, Option<String>)>>,
    /// State of every session handed out, in order
    pub sessions: Mutex<Vec<Arc<Mutex<SessionState>>>>,
    pub fail: bool,
    /// Time each connect takes
    pub delay: Option<Duration>,
}

#[async_trait]
impl ConnectionProvider for ScriptedProvider {
    async fn connect(
        &self,
        config: &ConnectionConfig,
        database: Option<&str>,
        schema: Option<&str>,
    ) -> Result<BoxedSession> {
        if let Some(delay) = self.delay {
            smol::Timer::after(delay).await;
        }
        if self.fail {
            return Err(Error::ConnectFailed(format!("{}: refused", config.name)));
        }
        self.opened
            .lock()
            .unwrap()
            .push((database.map(str::to_string), schema.map(str::to_string)));
        let session = ScriptedSession::new(config.dialect);
        self.sessions.lock().unwrap().push(session.state());
        Ok(session.boxed())
    }
}
