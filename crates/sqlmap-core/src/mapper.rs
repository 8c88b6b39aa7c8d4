//! The caller-facing entry point.

use std::sync::Arc;

use sqlmap_value::Value;
use tracing::debug;

use crate::driver::DataSource;
use crate::error::Result;
use crate::exec::{ExecutionListener, Session};
use crate::map::SqlMap;

/// A configured [`SqlMap`] bound to a [`DataSource`].
///
/// Sessions share the map, and so its caches. The convenience methods open
/// a short-lived session per call; use [`SqlMapper::open_session`] to run
/// several statements on one connection or inside a transaction.
#[derive(Clone)]
pub struct SqlMapper {
    map: Arc<SqlMap>,
    data_source: Arc<dyn DataSource>,
}

impl SqlMapper {
    pub fn new(map: SqlMap, data_source: Arc<dyn DataSource>) -> Self {
        Self::with_shared_map(Arc::new(map), data_source)
    }

    pub fn with_shared_map(map: Arc<SqlMap>, data_source: Arc<dyn DataSource>) -> Self {
        Self { map, data_source }
    }

    pub fn map(&self) -> &Arc<SqlMap> {
        &self.map
    }

    pub fn data_source(&self) -> &dyn DataSource {
        self.data_source.as_ref()
    }

    /// Open a session on a new connection.
    pub fn open_session(&self) -> Result<Session> {
        let connection = self.data_source.open()?;
        debug!(
            data_source = self.data_source.name(),
            connection = connection.identity(),
            "session opened"
        );
        Ok(Session::new(Arc::clone(&self.map), connection))
    }

    pub fn subscribe(&self, listener: Arc<dyn ExecutionListener>) {
        self.map.subscribe(listener);
    }

    /// Hit ratio of the cache behind `statement`.
    pub fn cache_hit_ratio(&self, statement: &str) -> Result<Option<f64>> {
        self.map.cache_hit_ratio(statement)
    }

    pub fn flush_caches(&self) {
        self.map.flush_caches();
    }

    pub fn query_for_object(&self, id: &str, parameter: &Value) -> Result<Value> {
        self.open_session()?.query_for_object(id, parameter)
    }

    pub fn query_for_list(&self, id: &str, parameter: &Value) -> Result<Vec<Value>> {
        self.open_session()?.query_for_list(id, parameter)
    }

    pub fn query_for_list_paged(
        &self,
        id: &str,
        parameter: &Value,
        skip: usize,
        max: usize,
    ) -> Result<Vec<Value>> {
        self.open_session()?
            .query_for_list_paged(id, parameter, skip, max)
    }

    pub fn query_for_map(
        &self,
        id: &str,
        parameter: &Value,
        key: &str,
        value: Option<&str>,
    ) -> Result<Vec<(Value, Value)>> {
        self.open_session()?.query_for_map(id, parameter, key, value)
    }

    pub fn insert(&self, id: &str, parameter: &mut Value) -> Result<Option<Value>> {
        self.open_session()?.insert(id, parameter)
    }

    pub fn update(&self, id: &str, parameter: &mut Value) -> Result<u64> {
        self.open_session()?.update(id, parameter)
    }

    pub fn delete(&self, id: &str, parameter: &mut Value) -> Result<u64> {
        self.open_session()?.delete(id, parameter)
    }
}

impl std::fmt::Debug for SqlMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlMapper")
            .field("map", &self.map)
            .field("data_source", &self.data_source.name())
            .finish()
    }
}
