//! Live query execution over `rusqlite`.

use std::path::Path;
use std::time::Duration;

use rusqlite::{ErrorCode, OpenFlags};
use sqlreward_core::execution::{Connection, ExecutionError, Row, Value};
use tracing::debug;

/// A read-only [`Connection`] to a SQLite database.
///
/// Statements that could modify the database are rejected before they run,
/// whatever the open flags of the underlying connection.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Wraps an existing connection.
    #[must_use]
    pub const fn new(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Opens the database at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Backend`] if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExecutionError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = rusqlite::Connection::open_with_flags(path, flags)
            .map_err(|e| ExecutionError::Backend(e.to_string()))?;
        Ok(Self::new(conn))
    }

    /// Sets how long a query waits on a locked database before failing
    /// with [`ExecutionError::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Backend`] if SQLite rejects the setting.
    pub fn busy_timeout(self, timeout: Duration) -> Result<Self, ExecutionError> {
        self.conn
            .busy_timeout(timeout)
            .map_err(|e| ExecutionError::Backend(e.to_string()))?;
        Ok(self)
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

impl Connection for SqliteConnection {
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, ExecutionError> {
        let mut stmt = self.conn.prepare(sql).map_err(map_error)?;
        if !stmt.readonly() {
            debug!(sql, "Rejected statement that writes");
            return Err(ExecutionError::ReadOnlyViolation);
        }

        let columns = stmt.column_count();
        let mut rows = stmt.query([]).map_err(map_error)?;
        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(map_error)? {
            let mut values = Vec::with_capacity(columns);
            for i in 0..columns {
                let value: rusqlite::types::Value = row.get(i).map_err(map_error)?;
                values.push(convert(value));
            }
            result.push(values);
        }
        Ok(result)
    }
}

fn convert(value: rusqlite::types::Value) -> Value {
    match value {
        rusqlite::types::Value::Null => Value::Null,
        rusqlite::types::Value::Integer(i) => Value::Integer(i),
        rusqlite::types::Value::Real(r) => Value::Real(r),
        rusqlite::types::Value::Text(s) => Value::Text(s),
        rusqlite::types::Value::Blob(b) => Value::Blob(b),
    }
}

fn map_error(err: rusqlite::Error) -> ExecutionError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ) =>
        {
            ExecutionError::Timeout
        }
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::InvalidColumnIndex(_) => ExecutionError::Backend(err.to_string()),
        _ => ExecutionError::Query(err.to_string()),
    }
}
