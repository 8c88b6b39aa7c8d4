//! Scripted in-memory driver used by unit tests.

use std::sync::Arc;

use parking_lot::Mutex;
use sqlmap_value::Value;

use super::{
    Command, CommandKind, Connection, DataSource, DbParameter, DriverError, Row, RowReader,
};

/// Canned response for commands whose SQL contains a pattern.
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    result_sets: Vec<(Arc<[String]>, Vec<Vec<Value>>)>,
    affected: u64,
    outputs: Vec<(usize, Value)>,
    fail: Option<String>,
}

impl Script {
    pub fn rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::default().then_rows(columns, rows)
    }

    pub fn then_rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        self.result_sets.push((columns, rows));
        self
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::rows(&["value"], vec![vec![value.into()]])
    }

    pub fn affected(count: u64) -> Self {
        Self {
            affected: count,
            ..Default::default()
        }
    }

    pub fn with_output(mut self, index: usize, value: impl Into<Value>) -> Self {
        self.outputs.push((index, value.into()));
        self
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail: Some(message.to_string()),
            ..Default::default()
        }
    }
}

/// A command as seen by the driver.
#[derive(Debug, Clone)]
pub(crate) struct Executed {
    pub sql: String,
    pub kind: CommandKind,
    pub parameters: Vec<DbParameter>,
}

impl Executed {
    pub fn values(&self) -> Vec<Value> {
        self.parameters.iter().map(|p| p.value.clone()).collect()
    }
}

#[derive(Debug, Default)]
struct MockState {
    scripts: Vec<(String, Script)>,
    executed: Vec<Executed>,
    transactions: Vec<&'static str>,
}

/// Data source whose connections answer from registered scripts.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockDataSource {
    state: Arc<Mutex<MockState>>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands whose SQL contains `pattern`. Later registrations win.
    pub fn on(&self, pattern: &str, script: Script) -> &Self {
        self.state.lock().scripts.push((pattern.to_string(), script));
        self
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().executed.clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.state
            .lock()
            .executed
            .iter()
            .filter(|e| e.sql.contains(pattern))
            .count()
    }

    pub fn transactions(&self) -> Vec<&'static str> {
        self.state.lock().transactions.clone()
    }
}

impl DataSource for MockDataSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn open(&self) -> Result<Box<dyn Connection>, DriverError> {
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl Connection for MockConnection {
    fn identity(&self) -> &str {
        "mock"
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.state.lock().transactions.push("begin");
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.state.lock().transactions.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.state.lock().transactions.push("rollback");
        Ok(())
    }

    fn create_command<'c>(
        &'c mut self,
        sql: &str,
        kind: CommandKind,
    ) -> Result<Box<dyn Command + 'c>, DriverError> {
        Ok(Box::new(MockCommand {
            state: Arc::clone(&self.state),
            sql: sql.to_string(),
            kind,
            parameters: Vec::new(),
            outputs: Vec::new(),
        }))
    }
}

struct MockCommand {
    state: Arc<Mutex<MockState>>,
    sql: String,
    kind: CommandKind,
    parameters: Vec<DbParameter>,
    outputs: Vec<(usize, Value)>,
}

impl MockCommand {
    fn run(&mut self) -> Result<Script, DriverError> {
        let mut state = self.state.lock();
        state.executed.push(Executed {
            sql: self.sql.clone(),
            kind: self.kind,
            parameters: self.parameters.clone(),
        });
        let script = state
            .scripts
            .iter()
            .rev()
            .find(|(pattern, _)| self.sql.contains(pattern.as_str()))
            .map(|(_, script)| script.clone())
            .unwrap_or_default();
        if let Some(message) = &script.fail {
            return Err(DriverError::Command(message.clone()));
        }
        self.outputs = script.outputs.clone();
        Ok(script)
    }
}

impl Command for MockCommand {
    fn add_parameter(&mut self, parameter: DbParameter) {
        self.parameters.push(parameter);
    }

    fn execute_reader<'r>(&'r mut self) -> Result<Box<dyn RowReader + 'r>, DriverError> {
        let script = self.run()?;
        Ok(Box::new(MockReader {
            result_sets: script.result_sets,
            current: 0,
            row: 0,
        }))
    }

    fn execute_non_query(&mut self) -> Result<u64, DriverError> {
        Ok(self.run()?.affected)
    }

    fn execute_scalar(&mut self) -> Result<Value, DriverError> {
        let script = self.run()?;
        Ok(script
            .result_sets
            .first()
            .and_then(|(_, rows)| rows.first())
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn parameter_value(&self, index: usize) -> Option<Value> {
        self.outputs
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, v)| v.clone())
            .or_else(|| self.parameters.get(index).map(|p| p.value.clone()))
    }
}

struct MockReader {
    result_sets: Vec<(Arc<[String]>, Vec<Vec<Value>>)>,
    current: usize,
    row: usize,
}

impl RowReader for MockReader {
    fn columns(&self) -> &[String] {
        self.result_sets
            .get(self.current)
            .map(|(columns, _)| &columns[..])
            .unwrap_or(&[])
    }

    fn next_row(&mut self) -> Result<Option<Row>, DriverError> {
        let Some((columns, rows)) = self.result_sets.get(self.current) else {
            return Ok(None);
        };
        let Some(values) = rows.get(self.row) else {
            return Ok(None);
        };
        self.row += 1;
        Ok(Some(Row::new(Arc::clone(columns), values.clone())))
    }

    fn next_result(&mut self) -> Result<bool, DriverError> {
        self.current += 1;
        self.row = 0;
        Ok(self.current < self.result_sets.len())
    }
}
