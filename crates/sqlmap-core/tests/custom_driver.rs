//! Pipeline tests against a driver and type handler defined outside the crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use sqlmap_core::driver::{
    Command, CommandKind, Connection, DataSource, DbParameter, DriverError, Row, RowReader,
};
use sqlmap_core::{
    new_shared_registry, CacheModelDef, Error, ObjectAccessor, PropertyAccessor, ResultMap,
    ResultProperty, SqlMap, SqlMapper, StatementDef, TypeHandler,
};
use pretty_assertions::assert_eq;
use sqlmap_value::Value;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serves `(id, name)` rows, filtered by the first bind value when present.
#[derive(Debug, Default)]
struct NameSource {
    executions: Arc<AtomicUsize>,
}

impl DataSource for NameSource {
    fn name(&self) -> &str {
        "names"
    }

    fn open(&self) -> Result<Box<dyn Connection>, DriverError> {
        Ok(Box::new(NameConnection {
            executions: Arc::clone(&self.executions),
        }))
    }
}

struct NameConnection {
    executions: Arc<AtomicUsize>,
}

impl Connection for NameConnection {
    fn identity(&self) -> &str {
        "names"
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn create_command<'c>(
        &'c mut self,
        _sql: &str,
        _kind: CommandKind,
    ) -> Result<Box<dyn Command + 'c>, DriverError> {
        Ok(Box::new(NameCommand {
            executions: &self.executions,
            parameters: Vec::new(),
        }))
    }
}

struct NameCommand<'c> {
    executions: &'c AtomicUsize,
    parameters: Vec<DbParameter>,
}

impl NameCommand<'_> {
    fn rows(&self) -> Vec<Vec<Value>> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let wanted = self.parameters.first().and_then(|p| p.value.as_i64());
        (0..10i64)
            .filter(|id| wanted.map_or(true, |w| w == *id))
            .map(|id| vec![Value::Int64(id), Value::from(format!("user{}", id))])
            .collect()
    }
}

impl Command for NameCommand<'_> {
    fn add_parameter(&mut self, parameter: DbParameter) {
        self.parameters.push(parameter);
    }

    fn execute_reader<'r>(&'r mut self) -> Result<Box<dyn RowReader + 'r>, DriverError> {
        Ok(Box::new(NameReader {
            columns: vec!["id".to_string(), "name".to_string()].into(),
            rows: self.rows().into_iter(),
        }))
    }

    fn execute_non_query(&mut self) -> Result<u64, DriverError> {
        Ok(self.rows().len() as u64)
    }

    fn execute_scalar(&mut self) -> Result<Value, DriverError> {
        Ok(self.rows().into_iter().next().and_then(|r| r.into_iter().next()).unwrap_or(Value::Null))
    }

    fn parameter_value(&self, index: usize) -> Option<Value> {
        self.parameters.get(index).map(|p| p.value.clone())
    }
}

struct NameReader {
    columns: Arc<[String]>,
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl RowReader for NameReader {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>, DriverError> {
        Ok(self.rows.next().map(|values| Row::new(Arc::clone(&self.columns), values)))
    }

    fn next_result(&mut self) -> Result<bool, DriverError> {
        Ok(false)
    }
}

#[derive(Debug)]
struct Shout;

impl TypeHandler for Shout {
    fn name(&self) -> &str {
        "shout"
    }

    fn from_database_value(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::String(s) => Ok(Value::String(s.to_uppercase())),
            Value::Null => Ok(Value::Null),
            other => Err(Error::Mapping(format!("cannot shout a {}", other.type_name()))),
        }
    }

    fn to_database_value(&self, value: &Value) -> Result<Value, Error> {
        Ok(value.clone())
    }

    fn value_of(&self, literal: &str) -> Result<Value, Error> {
        Ok(Value::from(literal))
    }
}

fn users_map(cache: CacheModelDef) -> SqlMap {
    SqlMap::builder()
        .type_handler("shout", Arc::new(Shout))
        .cache_model(cache)
        .result_map(
            ResultMap::new("user", "User")
                .property(ResultProperty::new("id").column("id").type_name("int"))
                .property(ResultProperty::new("name").column("name").type_name("shout")),
        )
        .statement(
            StatementDef::select("getUser", "SELECT id, name FROM users WHERE id = #value#")
                .unwrap()
                .result_map("user")
                .cache_model("users"),
        )
        .statement(StatementDef::select("allUsers", "SELECT id, name FROM users").unwrap().result_map("user"))
        .build()
        .unwrap()
}

#[test]
fn test_custom_type_handler_applies_to_columns() {
    init_tracing();
    let source = Arc::new(NameSource::default());
    let mapper = SqlMapper::new(users_map(CacheModelDef::lru("users", 4)), source);

    let user = mapper.query_for_object("getUser", &Value::Int64(3)).unwrap();
    assert_eq!(ObjectAccessor.get(&user, "id").unwrap(), Value::Int32(3));
    assert_eq!(ObjectAccessor.get(&user, "name").unwrap(), Value::from("USER3"));

    let everyone = mapper.query_for_list("allUsers", &Value::Null).unwrap();
    assert_eq!(everyone.len(), 10);
}

#[test]
fn test_concurrent_callers_share_one_cache() {
    init_tracing();
    let source = Arc::new(NameSource::default());
    let executions = Arc::clone(&source.executions);
    let mapper = SqlMapper::new(users_map(CacheModelDef::lru("users", 4)), source);
    let metrics = new_shared_registry();
    mapper.subscribe(metrics.clone());

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let mapper = mapper.clone();
            thread::spawn(move || {
                for round in 0..50i64 {
                    let id = (worker + round) % 10;
                    let user = mapper.query_for_object("getUser", &Value::Int64(id)).unwrap();
                    assert_eq!(
                        ObjectAccessor.get(&user, "name").unwrap(),
                        Value::from(format!("USER{}", id))
                    );
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(metrics.executions_of("getUser"), 400);
    assert_eq!(metrics.cache_hits() + metrics.cache_misses(), 400);
    assert_eq!(executions.load(Ordering::SeqCst) as u64, metrics.cache_misses());
    assert!(mapper.map().cache_model("users").unwrap().len() <= 4);
}

#[test]
fn test_wrong_column_type_fails_the_call() {
    init_tracing();
    let source = Arc::new(NameSource::default());
    let map = SqlMap::builder()
        .type_handler("shout", Arc::new(Shout))
        .result_map(ResultMap::new("bad", "User").property(ResultProperty::new("id").column("id").type_name("shout")))
        .statement(StatementDef::select("bad", "SELECT id FROM users").unwrap().result_map("bad"))
        .build()
        .unwrap();
    let mapper = SqlMapper::new(map, source);

    assert!(matches!(
        mapper.query_for_list("bad", &Value::Null),
        Err(Error::Mapping(message)) if message.contains("shout")
    ));
}
