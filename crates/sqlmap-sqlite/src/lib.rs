//! SQLite driver for sqlmap.
//!
//! [`SqliteDataSource`] opens a `rusqlite` connection per session. Result
//! rows are read eagerly when a reader is created, so the statement handle
//! is released before the first row reaches the mapper.
//!
//! ```ignore
//! let source = Arc::new(SqliteDataSource::new("app.db"));
//! let mapper = SqlMapper::new(map, source);
//! ```
//!
//! SQLite has no stored procedures; commands of kind
//! [`CommandKind::StoredProcedure`] are rejected.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, OpenFlags};
use sqlmap_core::driver::{
    Command, CommandKind, Connection, DataSource, DbParameter, DriverError, Row, RowReader,
};
use sqlmap_value::Value;
use tracing::{debug, trace};

/// Default time a connection waits on a locked database.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Data source for a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteDataSource {
    path: PathBuf,
    identity: String,
    flags: OpenFlags,
    busy_timeout: Duration,
    init: Option<String>,
}

impl SqliteDataSource {
    /// Read-write data source, creating the file when missing.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            identity: format!("sqlite:{}", path.display()),
            path,
            flags: OpenFlags::default(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            init: None,
        }
    }

    /// Open connections read-only.
    pub fn read_only(mut self) -> Self {
        self.flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// SQL run on every new connection, such as `PRAGMA foreign_keys = ON`.
    pub fn init_sql(mut self, sql: impl Into<String>) -> Self {
        self.init = Some(sql.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for SqliteDataSource {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn open(&self) -> Result<Box<dyn Connection>, DriverError> {
        let conn = rusqlite::Connection::open_with_flags(&self.path, self.flags)
            .map_err(|e| DriverError::Connection(e.to_string()))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| DriverError::Connection(e.to_string()))?;
        if let Some(init) = &self.init {
            conn.execute_batch(init)
                .map_err(|e| DriverError::Connection(e.to_string()))?;
        }
        debug!(path = %self.path.display(), "sqlite connection opened");
        Ok(Box::new(SqliteConnection {
            conn,
            identity: self.identity.clone(),
        }))
    }
}

/// One open SQLite connection.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
    identity: String,
}

impl SqliteConnection {
    fn batch(&self, sql: &str) -> Result<(), DriverError> {
        trace!(sql, "transaction control");
        self.conn
            .execute_batch(sql)
            .map_err(|e| DriverError::Transaction(e.to_string()))
    }
}

impl Connection for SqliteConnection {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.batch("ROLLBACK")
    }

    fn create_command<'c>(
        &'c mut self,
        sql: &str,
        kind: CommandKind,
    ) -> Result<Box<dyn Command + 'c>, DriverError> {
        if kind == CommandKind::StoredProcedure {
            return Err(DriverError::Unsupported(
                "sqlite has no stored procedures".to_string(),
            ));
        }
        Ok(Box::new(SqliteCommand {
            conn: &self.conn,
            sql: sql.to_string(),
            parameters: Vec::new(),
        }))
    }
}

struct SqliteCommand<'c> {
    conn: &'c rusqlite::Connection,
    sql: String,
    parameters: Vec<DbParameter>,
}

impl SqliteCommand<'_> {
    fn bound(&self) -> Result<Vec<SqlValue>, DriverError> {
        self.parameters.iter().map(|p| to_sql(&p.value)).collect()
    }

    fn prepare(&self) -> Result<rusqlite::Statement<'_>, DriverError> {
        self.conn.prepare(&self.sql).map_err(command_error)
    }

    /// Run the query and collect every row of its result set.
    fn collect(&self) -> Result<(Arc<[String]>, Vec<Vec<Value>>), DriverError> {
        let bound = self.bound()?;
        let mut stmt = self.prepare()?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(bound)).map_err(command_error)?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next().map_err(command_error)? {
            let values = (0..width)
                .map(|i| row.get_ref(i).map_err(command_error).and_then(from_sql))
                .collect::<Result<Vec<_>, _>>()?;
            collected.push(values);
        }
        Ok((columns, collected))
    }
}

impl Command for SqliteCommand<'_> {
    fn add_parameter(&mut self, parameter: DbParameter) {
        self.parameters.push(parameter);
    }

    fn execute_reader<'r>(&'r mut self) -> Result<Box<dyn RowReader + 'r>, DriverError> {
        let (columns, rows) = self.collect()?;
        trace!(rows = rows.len(), "sqlite rows read");
        Ok(Box::new(SqliteReader {
            columns,
            rows: rows.into_iter(),
        }))
    }

    fn execute_non_query(&mut self) -> Result<u64, DriverError> {
        let bound = self.bound()?;
        let mut stmt = self.prepare()?;
        let affected = stmt
            .execute(params_from_iter(bound))
            .map_err(command_error)?;
        Ok(affected as u64)
    }

    fn execute_scalar(&mut self) -> Result<Value, DriverError> {
        let (_, rows) = self.collect()?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or(Value::Null))
    }

    /// SQLite has no output parameters; the bound input is reported back.
    fn parameter_value(&self, index: usize) -> Option<Value> {
        self.parameters.get(index).map(|p| p.value.clone())
    }
}

struct SqliteReader {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl RowReader for SqliteReader {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>, DriverError> {
        Ok(self
            .rows
            .next()
            .map(|values| Row::new(Arc::clone(&self.columns), values)))
    }

    fn next_result(&mut self) -> Result<bool, DriverError> {
        Ok(false)
    }
}

fn command_error(err: rusqlite::Error) -> DriverError {
    DriverError::Command(err.to_string())
}

/// Convert a bind value to its SQLite storage class.
fn to_sql(value: &Value) -> Result<SqlValue, DriverError> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int32(n) => SqlValue::Integer(i64::from(*n)),
        Value::Int64(n) => SqlValue::Integer(*n),
        Value::Float32(f) => SqlValue::Real(f64::from(*f)),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Timestamp(micros) => SqlValue::Integer(*micros),
        other => {
            return Err(DriverError::UnsupportedValue(format!(
                "cannot bind {} value",
                other.type_name()
            )))
        }
    })
}

fn from_sql(value: ValueRef<'_>) -> Result<Value, DriverError> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int64(n),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(bytes) => Value::String(
            std::str::from_utf8(bytes)
                .map_err(|e| DriverError::UnsupportedValue(e.to_string()))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmap_core::driver::ColumnRef;

    fn source() -> (tempfile::TempDir, SqliteDataSource) {
        let dir = tempfile::tempdir().unwrap();
        let source = SqliteDataSource::new(dir.path().join("test.db"));
        (dir, source)
    }

    fn exec(conn: &mut dyn Connection, sql: &str, values: Vec<Value>) -> u64 {
        let mut command = conn.create_command(sql, CommandKind::Text).unwrap();
        for (i, value) in values.into_iter().enumerate() {
            command.add_parameter(DbParameter::input(format!("p{}", i), value));
        }
        command.execute_non_query().unwrap()
    }

    #[test]
    fn test_round_trips_storage_classes() {
        let (_dir, source) = source();
        let mut conn = source.open().unwrap();
        exec(conn.as_mut(), "CREATE TABLE t (i INTEGER, r REAL, s TEXT, b BLOB, f INTEGER)", vec![]);
        let inserted = exec(
            conn.as_mut(),
            "INSERT INTO t VALUES (?, ?, ?, ?, ?)",
            vec![
                Value::Int32(7),
                Value::Float64(1.5),
                Value::from("x"),
                Value::Bytes(vec![1, 2]),
                Value::Bool(true),
            ],
        );
        assert_eq!(inserted, 1);

        let mut command = conn.create_command("SELECT * FROM t", CommandKind::Text).unwrap();
        let mut reader = command.execute_reader().unwrap();
        assert_eq!(reader.columns(), &["i", "r", "s", "b", "f"]);
        let row = reader.next_row().unwrap().unwrap();
        assert_eq!(row.get(ColumnRef::Name("I")), Some(&Value::Int64(7)));
        assert_eq!(row.get(ColumnRef::Index(1)), Some(&Value::Float64(1.5)));
        assert_eq!(row.get(ColumnRef::Name("s")), Some(&Value::from("x")));
        assert_eq!(row.get(ColumnRef::Name("b")), Some(&Value::Bytes(vec![1, 2])));
        assert_eq!(row.get(ColumnRef::Name("f")), Some(&Value::Int64(1)));
        assert!(reader.next_row().unwrap().is_none());
        assert!(!reader.next_result().unwrap());
    }

    #[test]
    fn test_scalar_and_empty_scalar() {
        let (_dir, source) = source();
        let mut conn = source.open().unwrap();
        exec(conn.as_mut(), "CREATE TABLE t (n INTEGER)", vec![]);

        let mut command = conn.create_command("SELECT max(n) FROM t", CommandKind::Text).unwrap();
        assert_eq!(command.execute_scalar().unwrap(), Value::Null);
        drop(command);

        exec(conn.as_mut(), "INSERT INTO t VALUES (?)", vec![Value::Int64(3)]);
        let mut command = conn.create_command("SELECT n FROM t WHERE n > ?", CommandKind::Text).unwrap();
        command.add_parameter(DbParameter::input("n", Value::Int32(5)));
        assert_eq!(command.execute_scalar().unwrap(), Value::Null);
    }

    #[test]
    fn test_rollback_discards_changes() {
        let (_dir, source) = source();
        let mut conn = source.open().unwrap();
        exec(conn.as_mut(), "CREATE TABLE t (n INTEGER)", vec![]);
        conn.begin().unwrap();
        exec(conn.as_mut(), "INSERT INTO t VALUES (1)", vec![]);
        conn.rollback().unwrap();

        let mut command = conn.create_command("SELECT count(*) FROM t", CommandKind::Text).unwrap();
        assert_eq!(command.execute_scalar().unwrap(), Value::Int64(0));
    }

    #[test]
    fn test_rejects_unsupported_commands_and_values() {
        let (_dir, source) = source();
        let mut conn = source.open().unwrap();
        assert!(matches!(
            conn.create_command("calc", CommandKind::StoredProcedure).err(),
            Some(DriverError::Unsupported(_))
        ));

        let mut command = conn.create_command("SELECT ?", CommandKind::Text).unwrap();
        command.add_parameter(DbParameter::input("l", Value::List(vec![])));
        assert!(matches!(
            command.execute_scalar(),
            Err(DriverError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_commit_without_begin_fails() {
        let (_dir, source) = source();
        let mut conn = source.open().unwrap();
        assert!(matches!(conn.commit(), Err(DriverError::Transaction(_))));
        assert!(conn.identity().ends_with("test.db"));
    }

    #[test]
    fn test_bad_sql_is_command_error() {
        let (_dir, source) = source();
        let mut conn = source.open().unwrap();
        let mut command = conn.create_command("SELEC nope", CommandKind::Text).unwrap();
        assert!(matches!(command.execute_non_query(), Err(DriverError::Command(_))));
    }
}
