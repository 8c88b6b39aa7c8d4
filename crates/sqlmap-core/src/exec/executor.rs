//! Per-call statement execution over one connection.

use std::collections::HashMap;
use std::time::Instant;

use sqlmap_value::Value;
use tracing::{debug, instrument};

use crate::binding::{OutputValue, ParameterBinder};
use crate::cache::{CacheKey, CacheModel};
use crate::driver::{CommandKind, Connection, DbParameter, ParameterDirection};
use crate::error::{Error, Result};
use crate::map::{MappedStatement, SqlMap};
use crate::mapping::{KeyTiming, ParameterProperty, SelectKey, StatementKind};
use crate::result::{RequestScope, ResultMapper};
use crate::sql::{RequestSql, Sql};

use super::event::{CacheOutcome, ExecutionEvent};

/// What a query call returns, and so what its cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape<'s> {
    /// The last mapped object, or null.
    Object,
    /// All mapped objects, windowed over the first result set.
    List { skip: usize, max: Option<usize> },
    /// `[key, value]` pairs keyed by a member of each object.
    Map { key: &'s str, value: Option<&'s str> },
}

impl<'s> Shape<'s> {
    pub(crate) const ALL: Self = Shape::List { skip: 0, max: None };

    fn tag(&self) -> &'static str {
        match self {
            Shape::Object => "object",
            Shape::List { .. } => "list",
            Shape::Map { .. } => "map",
        }
    }

    fn window(&self) -> (usize, Option<usize>) {
        match *self {
            Shape::List { skip, max } => (skip, max),
            _ => (0, None),
        }
    }

    fn fold_into(&self, key: &mut CacheKey) {
        match *self {
            Shape::Object => {}
            Shape::List { skip, max } => {
                key.update(skip.to_le_bytes());
                key.update(max.map_or(u64::MAX, |m| m as u64).to_le_bytes());
            }
            Shape::Map { key: member, value } => {
                key.update(member);
                key.update(value.unwrap_or(""));
            }
        }
    }
}

/// SQL text and bind values for one call.
struct Prepared {
    request: RequestSql,
    properties: Vec<ParameterProperty>,
    parameters: Vec<DbParameter>,
}

/// Runs statements of a [`SqlMap`] on a borrowed connection.
pub(crate) struct StatementExecutor<'a> {
    map: &'a SqlMap,
    connection: &'a mut dyn Connection,
}

impl<'a> StatementExecutor<'a> {
    pub fn new(map: &'a SqlMap, connection: &'a mut dyn Connection) -> Self {
        Self { map, connection }
    }

    /// Run a query, consulting the statement's cache when there is one.
    #[instrument(level = "debug", skip(self, parameter))]
    pub fn query(&mut self, id: &str, parameter: &Value, shape: Shape<'_>) -> Result<Value> {
        let map = self.map;
        let statement = map.statement(id)?;
        let started = Instant::now();
        map.flush_triggered_by(id);

        let prepared = self.prepare(statement, parameter)?;
        let cache = statement
            .cache()
            .filter(|_| map.settings().cache_models_enabled);

        let mut outcome = CacheOutcome::Uncached;
        let mut cache_key = None;
        if let Some(cache) = cache {
            let key = self.cache_key(statement, cache, &prepared, parameter, shape)?;
            if let Some(value) = cache.get(&key)? {
                self.finish(statement, started, count_rows(&value), CacheOutcome::Hit);
                return Ok(value);
            }
            outcome = CacheOutcome::Miss;
            cache_key = Some(key);
        }

        let (skip, max) = shape.window();
        let (results, _) = self.execute_query(statement, prepared, skip, max)?;
        let value = self.shape_results(results, shape)?;

        if let (Some(cache), Some(key)) = (cache, cache_key) {
            cache.put(key, &value)?;
        }
        map.flush_triggered_by(id);
        self.finish(statement, started, count_rows(&value), outcome);
        Ok(value)
    }

    /// Run a query that also writes output parameters back, bypassing the
    /// cache.
    #[instrument(level = "debug", skip(self, parameter))]
    pub fn query_procedure(&mut self, id: &str, parameter: &mut Value) -> Result<Vec<Value>> {
        let map = self.map;
        let statement = map.statement(id)?;
        let started = Instant::now();
        map.flush_triggered_by(id);

        let prepared = self.prepare(statement, parameter)?;
        let (results, outputs) = self.execute_query(statement, prepared, 0, None)?;
        self.binder().apply_outputs(&outputs, parameter)?;

        map.flush_triggered_by(id);
        self.finish(statement, started, results.len() as u64, CacheOutcome::Uncached);
        Ok(results)
    }

    /// Run an insert. Returns the generated key when the statement declares
    /// a select key, otherwise the procedure's return value if it has one.
    #[instrument(level = "debug", skip(self, parameter))]
    pub fn insert(&mut self, id: &str, parameter: &mut Value) -> Result<Option<Value>> {
        let map = self.map;
        let statement = map.statement(id)?;
        let started = Instant::now();
        map.flush_triggered_by(id);

        let mut key = None;
        if let Some((select_key, sql)) = statement.select_key() {
            if select_key.timing == KeyTiming::Pre {
                key = Some(self.select_key(select_key, sql, parameter)?);
            }
        }

        let (affected, outputs) = self.execute_non_query(statement, parameter)?;
        self.binder().apply_outputs(&outputs, parameter)?;

        if let Some((select_key, sql)) = statement.select_key() {
            if select_key.timing == KeyTiming::Post {
                key = Some(self.select_key(select_key, sql, parameter)?);
            }
        }

        map.flush_triggered_by(id);
        self.finish(statement, started, affected, CacheOutcome::Uncached);

        Ok(key.or_else(|| {
            outputs
                .into_iter()
                .find(|o| o.direction == ParameterDirection::ReturnValue)
                .map(|o| o.value)
        }))
    }

    /// Run an update, delete or procedure. Returns the affected row count.
    #[instrument(level = "debug", skip(self, parameter))]
    pub fn update(&mut self, id: &str, parameter: &mut Value) -> Result<u64> {
        let map = self.map;
        let statement = map.statement(id)?;
        let started = Instant::now();
        map.flush_triggered_by(id);

        let (affected, outputs) = self.execute_non_query(statement, parameter)?;
        self.binder().apply_outputs(&outputs, parameter)?;

        map.flush_triggered_by(id);
        self.finish(statement, started, affected, CacheOutcome::Uncached);
        Ok(affected)
    }

    /// Replace every [`Value::Deferred`] in `target` with the result of its
    /// statement. Values loaded here are not searched again.
    pub fn load(&mut self, target: &mut Value) -> Result<usize> {
        match target {
            Value::Deferred(deferred) => {
                let deferred = deferred.clone();
                let shape = if deferred.many { Shape::ALL } else { Shape::Object };
                *target = self.query(&deferred.statement, &deferred.parameter, shape)?;
                Ok(1)
            }
            Value::List(items) => {
                let mut loaded = 0;
                for item in items {
                    loaded += self.load(item)?;
                }
                Ok(loaded)
            }
            Value::Object(object) => {
                let mut loaded = 0;
                for member in object.values_mut() {
                    loaded += self.load(member)?;
                }
                Ok(loaded)
            }
            _ => Ok(0),
        }
    }

    fn binder(&self) -> ParameterBinder<'a> {
        ParameterBinder::new(self.map.accessor(), self.map.handlers())
    }

    fn prepare(&self, statement: &MappedStatement, parameter: &Value) -> Result<Prepared> {
        let mut request = statement.sql().request(parameter, self.map.accessor())?;
        let properties = match statement.declared_parameters() {
            Some(declared) => declared.to_vec(),
            None => std::mem::take(&mut request.parameters),
        };
        let parameters = self.binder().bind(&properties, parameter)?;
        debug!(
            statement = statement.id(),
            sql = %request.text,
            parameters = parameters.len(),
            "executing"
        );
        Ok(Prepared {
            request,
            properties,
            parameters,
        })
    }

    fn cache_key(
        &self,
        statement: &MappedStatement,
        cache: &CacheModel,
        prepared: &Prepared,
        parameter: &Value,
        shape: Shape<'_>,
    ) -> Result<CacheKey> {
        let mut key = CacheKey::new();
        key.update(shape.tag())
            .update(statement.id())
            .update(self.connection.identity());
        for bound in &prepared.parameters {
            key.update_value(&bound.value);
        }
        key.update(&prepared.request.text);
        shape.fold_into(&mut key);

        if cache.needs_snapshot() {
            let mut snapshot = blake3::Hasher::new();
            snapshot.update(&serde_json::to_vec(parameter)?);
            snapshot.update(prepared.request.text.as_bytes());
            key.update(snapshot.finalize().as_bytes());
        }
        Ok(key)
    }

    /// Execute a reader, map every result set, then drain the sub-selects
    /// queued while mapping.
    fn execute_query(
        &mut self,
        statement: &MappedStatement,
        prepared: Prepared,
        skip: usize,
        max: Option<usize>,
    ) -> Result<(Vec<Value>, Vec<OutputValue>)> {
        let map = self.map;
        let binder = self.binder();
        let mut scope = RequestScope::new(statement.id());

        let (mut results, outputs) = {
            let mut command = self
                .connection
                .create_command(&prepared.request.text, command_kind(statement.kind()))?;
            for parameter in prepared.parameters {
                command.add_parameter(parameter);
            }
            let results = {
                let mut reader = command.execute_reader()?;
                ResultMapper::new(map).read_all(statement, reader.as_mut(), &mut scope, skip, max)?
            };
            let outputs = binder.retrieve_outputs(&prepared.properties, command.as_ref())?;
            (results, outputs)
        };

        while let Some(binding) = scope.next_binding() {
            let shape = if binding.many { Shape::ALL } else { Shape::Object };
            let value = self.query(&binding.statement, &binding.parameter, shape)?;
            let target = results.get_mut(binding.root).ok_or_else(|| {
                Error::mapping(format!(
                    "sub-select '{}' targets result {} of {}",
                    binding.statement,
                    binding.root,
                    scope.statement()
                ))
            })?;
            map.accessor().set(target, &binding.path.to_string(), value)?;
        }
        Ok((results, outputs))
    }

    fn execute_non_query(
        &mut self,
        statement: &MappedStatement,
        parameter: &Value,
    ) -> Result<(u64, Vec<OutputValue>)> {
        let binder = self.binder();
        let prepared = self.prepare(statement, parameter)?;
        let mut command = self
            .connection
            .create_command(&prepared.request.text, command_kind(statement.kind()))?;
        for bound in prepared.parameters {
            command.add_parameter(bound);
        }
        let affected = command.execute_non_query()?;
        let outputs = binder.retrieve_outputs(&prepared.properties, command.as_ref())?;
        Ok((affected, outputs))
    }

    /// Run a select-key query and write its scalar to the parameter object.
    fn select_key(&mut self, key: &SelectKey, sql: &Sql, parameter: &mut Value) -> Result<Value> {
        let map = self.map;
        let binder = self.binder();
        let request = sql.request(parameter, map.accessor())?;
        let bound = binder.bind(&request.parameters, parameter)?;
        debug!(property = %key.property, sql = %request.text, "select key");

        let raw = {
            let mut command = self
                .connection
                .create_command(&request.text, CommandKind::Text)?;
            for parameter in bound {
                command.add_parameter(parameter);
            }
            command.execute_scalar()?
        };
        let value = map
            .handlers()
            .resolve(key.result_class.as_deref(), None)?
            .from_database_value(raw)?;

        if !parameter.is_scalar() || parameter.is_null() {
            map.accessor().set(parameter, &key.property, value.clone())?;
        }
        Ok(value)
    }

    fn shape_results(&self, mut results: Vec<Value>, shape: Shape<'_>) -> Result<Value> {
        match shape {
            Shape::Object => Ok(results.pop().unwrap_or(Value::Null)),
            Shape::List { .. } => Ok(Value::List(results)),
            Shape::Map { key, value } => {
                let accessor = self.map.accessor();
                let mut positions: HashMap<Vec<u8>, usize> = HashMap::new();
                let mut entries: Vec<Value> = Vec::with_capacity(results.len());
                for item in results {
                    let entry_key = accessor.get(&item, key)?;
                    let entry_value = match value {
                        Some(member) => accessor.get(&item, member)?,
                        None => item,
                    };
                    let entry = Value::List(vec![entry_key.clone(), entry_value]);
                    match positions.get(&entry_key.canonical_bytes()) {
                        Some(&index) => entries[index] = entry,
                        None => {
                            positions.insert(entry_key.canonical_bytes(), entries.len());
                            entries.push(entry);
                        }
                    }
                }
                Ok(Value::List(entries))
            }
        }
    }

    fn finish(&self, statement: &MappedStatement, started: Instant, rows: u64, cache: CacheOutcome) {
        self.map.notify(&ExecutionEvent {
            statement: statement.id().to_string(),
            kind: statement.kind(),
            elapsed: started.elapsed(),
            rows,
            cache,
        });
    }
}

fn command_kind(kind: StatementKind) -> CommandKind {
    match kind {
        StatementKind::Procedure => CommandKind::StoredProcedure,
        _ => CommandKind::Text,
    }
}

fn count_rows(value: &Value) -> u64 {
    match value {
        Value::Null => 0,
        Value::List(items) => items.len() as u64,
        _ => 1,
    }
}
