//! Sessions: one connection, optionally inside a transaction.

use std::sync::Arc;

use sqlmap_value::Value;
use tracing::{debug, warn};

use crate::driver::{Connection, DriverError};
use crate::error::Result;
use crate::map::SqlMap;

use super::executor::{Shape, StatementExecutor};

/// A unit of work over one database connection.
///
/// Every execution method resolves the statement by id in the session's
/// [`SqlMap`]. Dropping a session with an open transaction rolls it back.
pub struct Session {
    map: Arc<SqlMap>,
    connection: Box<dyn Connection>,
    in_transaction: bool,
}

impl Session {
    pub fn new(map: Arc<SqlMap>, connection: Box<dyn Connection>) -> Self {
        Self {
            map,
            connection,
            in_transaction: false,
        }
    }

    pub fn map(&self) -> &Arc<SqlMap> {
        &self.map
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn begin_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(DriverError::Transaction("a transaction is already open".into()).into());
        }
        self.connection.begin()?;
        self.in_transaction = true;
        debug!(connection = self.connection.identity(), "transaction started");
        Ok(())
    }

    pub fn commit_transaction(&mut self) -> Result<()> {
        self.require_transaction("commit")?;
        self.connection.commit()?;
        self.in_transaction = false;
        debug!(connection = self.connection.identity(), "transaction committed");
        Ok(())
    }

    pub fn rollback_transaction(&mut self) -> Result<()> {
        self.require_transaction("rollback")?;
        self.connection.rollback()?;
        self.in_transaction = false;
        debug!(connection = self.connection.identity(), "transaction rolled back");
        Ok(())
    }

    /// Run a query and return its last mapped object, or null when it
    /// produced none.
    pub fn query_for_object(&mut self, id: &str, parameter: &Value) -> Result<Value> {
        self.executor().query(id, parameter, Shape::Object)
    }

    pub fn query_for_list(&mut self, id: &str, parameter: &Value) -> Result<Vec<Value>> {
        self.executor()
            .query(id, parameter, Shape::ALL)
            .map(into_list)
    }

    /// Like [`Session::query_for_list`], skipping `skip` rows of the first
    /// result set and mapping at most `max`.
    pub fn query_for_list_paged(
        &mut self,
        id: &str,
        parameter: &Value,
        skip: usize,
        max: usize,
    ) -> Result<Vec<Value>> {
        self.executor()
            .query(id, parameter, Shape::List { skip, max: Some(max) })
            .map(into_list)
    }

    /// Hand each mapped object to `delegate` in row order.
    ///
    /// The result is fully buffered first: every row is read, grouped and
    /// has its sub-selects loaded before the first call. Use it for
    /// per-object processing, not to bound memory on large results. An
    /// error from `delegate` stops the iteration and is returned.
    pub fn query_with_row_delegate<F>(&mut self, id: &str, parameter: &Value, mut delegate: F) -> Result<()>
    where
        F: FnMut(Value) -> Result<()>,
    {
        for item in self.query_for_list(id, parameter)? {
            delegate(item)?;
        }
        Ok(())
    }

    /// Run a query and key each object by its `key` member.
    ///
    /// With `value` set, the entry holds that member instead of the whole
    /// object. A repeated key replaces the earlier entry in place.
    pub fn query_for_map(
        &mut self,
        id: &str,
        parameter: &Value,
        key: &str,
        value: Option<&str>,
    ) -> Result<Vec<(Value, Value)>> {
        self.executor()
            .query(id, parameter, Shape::Map { key, value })
            .map(into_pairs)
    }

    pub fn query_for_map_with_delegate<F>(
        &mut self,
        id: &str,
        parameter: &Value,
        key: &str,
        value: Option<&str>,
        mut delegate: F,
    ) -> Result<()>
    where
        F: FnMut(Value, Value) -> Result<()>,
    {
        for (k, v) in self.query_for_map(id, parameter, key, value)? {
            delegate(k, v)?;
        }
        Ok(())
    }

    /// Run a query whose output parameters are written back to `parameter`.
    pub fn query_procedure(&mut self, id: &str, parameter: &mut Value) -> Result<Vec<Value>> {
        self.executor().query_procedure(id, parameter)
    }

    pub fn insert(&mut self, id: &str, parameter: &mut Value) -> Result<Option<Value>> {
        self.executor().insert(id, parameter)
    }

    pub fn update(&mut self, id: &str, parameter: &mut Value) -> Result<u64> {
        self.executor().update(id, parameter)
    }

    pub fn delete(&mut self, id: &str, parameter: &mut Value) -> Result<u64> {
        self.executor().update(id, parameter)
    }

    /// Resolve the lazily loaded members of `target`. Returns how many were
    /// loaded.
    pub fn load(&mut self, target: &mut Value) -> Result<usize> {
        self.executor().load(target)
    }

    fn executor(&mut self) -> StatementExecutor<'_> {
        StatementExecutor::new(&self.map, self.connection.as_mut())
    }

    fn require_transaction(&self, action: &str) -> Result<()> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(DriverError::Transaction(format!("no open transaction to {}", action)).into())
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.in_transaction {
            return;
        }
        warn!(
            connection = self.connection.identity(),
            "session dropped with an open transaction, rolling back"
        );
        if let Err(e) = self.connection.rollback() {
            warn!(error = %e, "rollback failed");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection.identity())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn into_pairs(value: Value) -> Vec<(Value, Value)> {
    into_list(value)
        .into_iter()
        .filter_map(|entry| match entry {
            Value::List(pair) => {
                let mut pair = pair.into_iter();
                Some((pair.next()?, pair.next().unwrap_or(Value::Null)))
            }
            _ => None,
        })
        .collect()
}
