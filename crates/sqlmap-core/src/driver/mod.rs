//! Database driver capability.
//!
//! The pipeline talks to a database through four traits:
//!
//! - [`DataSource`] opens connections
//! - [`Connection`] creates commands and controls transactions
//! - [`Command`] carries SQL text plus bind parameters and executes
//! - [`RowReader`] streams [`Row`]s from one or more result sets
//!
//! A command mutably borrows its connection and a reader mutably borrows its
//! command, so at most one result stream is open per connection at any time.
//! Deferred sub-selects are therefore only run after the primary reader has
//! been dropped.

mod error;
#[cfg(test)]
pub(crate) mod mock;

pub use error::DriverError;

use std::sync::Arc;

use sqlmap_value::Value;

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Plain SQL text with `?` placeholders.
    Text,
    /// Name of a stored procedure.
    StoredProcedure,
}

/// Direction of a bind parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterDirection {
    #[default]
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

impl ParameterDirection {
    /// Parse a direction name as written in inline parameters.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "input" | "in" => Some(ParameterDirection::Input),
            "output" | "out" => Some(ParameterDirection::Output),
            "inputoutput" | "inout" => Some(ParameterDirection::InputOutput),
            "returnvalue" | "return" => Some(ParameterDirection::ReturnValue),
            _ => None,
        }
    }

    /// Whether the driver writes a value back after execution.
    pub fn is_output(self) -> bool {
        !matches!(self, ParameterDirection::Input)
    }

    /// Whether the parameter carries a value into the command.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            ParameterDirection::Input | ParameterDirection::InputOutput
        )
    }
}

/// A bind parameter handed to a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub struct DbParameter {
    /// Parameter name (the property path it was bound from).
    pub name: String,
    /// Value to send; `Null` for pure output parameters.
    pub value: Value,
    pub direction: ParameterDirection,
    /// Database type hint.
    pub db_type: Option<String>,
}

impl DbParameter {
    /// Create an input parameter.
    pub fn input(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            direction: ParameterDirection::Input,
            db_type: None,
        }
    }
}

/// Reference to a column of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Name(&'a str),
    Index(usize),
}

impl std::fmt::Display for ColumnRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnRef::Name(name) => write!(f, "{}", name),
            ColumnRef::Index(index) => write!(f, "#{}", index),
        }
    }
}

/// One row of a result set.
///
/// Column lookup by name is case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. `values` must be in column order.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column values in order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Position of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Look up a column value.
    pub fn get(&self, column: ColumnRef<'_>) -> Option<&Value> {
        match column {
            ColumnRef::Name(name) => self.index_of(name).map(|i| &self.values[i]),
            ColumnRef::Index(index) => self.values.get(index),
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Source of database connections.
pub trait DataSource: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Open a new connection.
    fn open(&self) -> Result<Box<dyn Connection>, DriverError>;
}

/// An open database connection.
pub trait Connection: Send {
    /// Stable identity of the database this connection talks to.
    ///
    /// Folded into cache keys so results from different databases never
    /// collide.
    fn identity(&self) -> &str;

    /// Begin a transaction.
    fn begin(&mut self) -> Result<(), DriverError>;

    /// Commit the current transaction.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// Roll back the current transaction.
    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Create a command. The command borrows the connection until dropped.
    fn create_command<'c>(
        &'c mut self,
        sql: &str,
        kind: CommandKind,
    ) -> Result<Box<dyn Command + 'c>, DriverError>;
}

/// A command ready to execute.
pub trait Command {
    /// Append a bind parameter. Parameters bind positionally.
    fn add_parameter(&mut self, parameter: DbParameter);

    /// Execute and stream rows. The reader borrows the command.
    fn execute_reader<'r>(&'r mut self) -> Result<Box<dyn RowReader + 'r>, DriverError>;

    /// Execute and return the number of affected rows.
    fn execute_non_query(&mut self) -> Result<u64, DriverError>;

    /// Execute and return the first column of the first row, or null.
    fn execute_scalar(&mut self) -> Result<Value, DriverError>;

    /// Value of a parameter after execution, for output directions.
    fn parameter_value(&self, index: usize) -> Option<Value>;
}

/// A forward-only stream over one or more result sets.
pub trait RowReader {
    /// Column names of the current result set.
    fn columns(&self) -> &[String];

    /// Fetch the next row of the current result set.
    fn next_row(&mut self) -> Result<Option<Row>, DriverError>;

    /// Advance to the next result set. Returns false when there is none.
    fn next_result(&mut self) -> Result<bool, DriverError>;
}
