// used for persistence
use rusqlite::types::Value;
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::ConnectionSettings;
use crate::error::{CostarError, Result};

/// A result row, column values in select order.
pub type Row = Vec<Value>;

/// Something that can stop a statement running on another thread.
pub trait Interrupt: Send + Sync {
    fn interrupt(&self);
}
impl Interrupt for InterruptHandle {
    fn interrupt(&self) {
        InterruptHandle::interrupt(self)
    }
}

/// The narrow capability the miner needs from a relational store: run a
/// set-oriented statement and either count the affected rows or read the
/// rows back.
pub trait StorageSession {
    fn execute(&mut self, statement: &str) -> Result<usize>;
    fn query(&mut self, statement: &str) -> Result<Vec<Row>>;
    fn interrupter(&self) -> Option<Arc<dyn Interrupt>> {
        None
    }
}

impl<S: StorageSession + ?Sized> StorageSession for &mut S {
    fn execute(&mut self, statement: &str) -> Result<usize> {
        (**self).execute(statement)
    }
    fn query(&mut self, statement: &str) -> Result<Vec<Row>> {
        (**self).query(statement)
    }
    fn interrupter(&self) -> Option<Arc<dyn Interrupt>> {
        (**self).interrupter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}
impl PersistenceMode {
    pub fn from_database(database: &str) -> Option<Self> {
        match database.trim() {
            "" => None,
            ":memory:" => Some(PersistenceMode::InMemory),
            path => Some(PersistenceMode::File(path.to_string())),
        }
    }
}

// SQLite runs inside the process, so only local host names make sense
fn is_local(host: &str) -> bool {
    matches!(host.trim(), "" | "localhost" | "127.0.0.1" | "::1")
}

// ------------- Persistence -------------
pub struct SqliteSession {
    connection: Connection,
}
impl SqliteSession {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
    pub fn open(settings: &ConnectionSettings) -> Result<Self> {
        if !is_local(&settings.host) {
            return Err(CostarError::Connection(format!(
                "host '{}' is not reachable, SQLite databases are opened locally",
                settings.host
            )));
        }
        let mode = PersistenceMode::from_database(&settings.database)
            .ok_or_else(|| CostarError::Connection("no database given".into()))?;
        // An existing file is required; opening must never create an empty database.
        let connection = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory(),
            PersistenceMode::File(path) => Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ),
        }
        .map_err(|e| {
            CostarError::Connection(format!("could not open '{}': {e}", settings.database))
        })?;
        connection
            .query_row("select 1", [], |r| r.get::<_, i64>(0))
            .map_err(|e| CostarError::Connection(e.to_string()))?;
        if !settings.username.is_empty() || !settings.password.is_empty() {
            debug!(user = %settings.username, "SQLite does not authenticate, credentials are unused");
        }
        debug!(?mode, "session opened");
        Ok(Self { connection })
    }
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl StorageSession for SqliteSession {
    fn execute(&mut self, statement: &str) -> Result<usize> {
        debug!(%statement, "execute");
        let changed = self.connection.execute(statement, [])?;
        trace!(changed, "executed");
        Ok(changed)
    }
    fn query(&mut self, statement: &str) -> Result<Vec<Row>> {
        debug!(%statement, "query");
        let mut prepared = self.connection.prepare(statement)?;
        let width = prepared.column_count();
        let rows: rusqlite::Result<Vec<Row>> = prepared
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect();
        let rows = rows?;
        trace!(rows = rows.len(), "queried");
        Ok(rows)
    }
    fn interrupter(&self) -> Option<Arc<dyn Interrupt>> {
        Some(Arc::new(self.connection.get_interrupt_handle()))
    }
}

/// Runs `work` inside a savepoint: either everything it executed stays, or
/// nothing does.
pub fn atomically<S, T, F>(session: &mut S, name: &str, work: F) -> Result<T>
where
    S: StorageSession + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    session.execute(&format!("savepoint {name}"))?;
    match work(session) {
        Ok(value) => {
            session.execute(&format!("release {name}"))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = session
                .execute(&format!("rollback to {name}"))
                .and_then(|_| session.execute(&format!("release {name}")))
            {
                warn!(savepoint = name, error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

/// Quotes a string as an SQL text literal.
pub fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Reads an integer column, rejecting anything else.
pub fn integer_at(row: &Row, column: usize) -> Result<i64> {
    match row.get(column) {
        Some(Value::Integer(i)) => Ok(*i),
        Some(other) => Err(CostarError::Storage(format!(
            "column {column} holds {other:?} where an integer was expected"
        ))),
        None => Err(CostarError::Storage(format!(
            "row has {} columns, column {column} is missing",
            row.len()
        ))),
    }
}
