//! Cache models: a controller behind a lock, plus flush and hit accounting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sqlmap_value::Value;
use tracing::{debug, trace};

use crate::error::Error;
use crate::mapping::{CacheModelDef, CachePolicy};

use super::controller::{
    CacheController, CacheEntry, FifoController, LruController, UnboundedController,
};
use super::key::CacheKey;

struct CacheState {
    controller: Box<dyn CacheController>,
    last_flush: Instant,
}

/// A configured cache shared by every statement that references it.
///
/// A single mutex guards the controller, so concurrent callers never
/// corrupt its eviction order.
pub struct CacheModel {
    id: String,
    read_only: bool,
    serialize: bool,
    flush_interval: Option<Duration>,
    state: Mutex<CacheState>,
    requests: AtomicU64,
    hits: AtomicU64,
}

impl std::fmt::Debug for CacheModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheModel")
            .field("id", &self.id)
            .field("read_only", &self.read_only)
            .field("serialize", &self.serialize)
            .field("flush_interval", &self.flush_interval)
            .field("len", &self.len())
            .finish()
    }
}

impl CacheModel {
    /// Build a model from its descriptor. Bounded policies without a
    /// declared capacity use `default_capacity`.
    pub fn from_def(def: &CacheModelDef, default_capacity: usize) -> Self {
        let capacity = def.capacity.unwrap_or(default_capacity);
        let controller: Box<dyn CacheController> = match def.policy {
            CachePolicy::Unbounded => Box::new(UnboundedController::new()),
            CachePolicy::Lru => Box::new(LruController::new(capacity)),
            CachePolicy::Fifo => Box::new(FifoController::new(capacity)),
        };
        Self::with_controller(def, controller)
    }

    /// Build a model around a custom controller.
    pub fn with_controller(def: &CacheModelDef, controller: Box<dyn CacheController>) -> Self {
        Self {
            id: def.id.clone(),
            read_only: def.read_only,
            serialize: def.serialize,
            flush_interval: def.flush_interval,
            state: Mutex::new(CacheState {
                controller,
                last_flush: Instant::now(),
            }),
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_serialize(&self) -> bool {
        self.serialize
    }

    /// Whether keys for this cache must carry a snapshot of the request.
    pub fn needs_snapshot(&self) -> bool {
        !self.read_only && !self.serialize
    }

    /// Look up a result.
    ///
    /// `Some(Value::Null)` is a cached null result, distinct from `None`.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Value>, Error> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let entry = {
            let mut state = self.state.lock();
            self.expire(&mut state);
            state.controller.get(key)
        };
        let Some(entry) = entry else {
            trace!(cache = %self.id, "cache miss");
            return Ok(None);
        };
        self.hits.fetch_add(1, Ordering::Relaxed);
        trace!(cache = %self.id, "cache hit");
        let value = match entry {
            CacheEntry::Null => Value::Null,
            CacheEntry::Value(value) => value,
            CacheEntry::Serialized(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Cache(format!("cannot restore entry of cache '{}': {}", self.id, e))
            })?,
        };
        Ok(Some(value))
    }

    /// Store a result. Null results are stored as a marker.
    pub fn put(&self, key: CacheKey, value: &Value) -> Result<(), Error> {
        let entry = if value.is_null() {
            CacheEntry::Null
        } else if self.serialize {
            CacheEntry::Serialized(serde_json::to_vec(value).map_err(|e| {
                Error::Cache(format!("cannot store entry in cache '{}': {}", self.id, e))
            })?)
        } else {
            CacheEntry::Value(value.clone())
        };

        let mut state = self.state.lock();
        self.expire(&mut state);
        if state.controller.put(key, entry).is_some() {
            trace!(cache = %self.id, "cache evict");
        }
        trace!(cache = %self.id, size = state.controller.len(), "cache put");
        Ok(())
    }

    /// Remove one entry.
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.state.lock().controller.remove(key).is_some()
    }

    /// Drop every entry.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        state.controller.flush();
        state.last_flush = Instant::now();
        debug!(cache = %self.id, "cache flushed");
    }

    pub fn len(&self) -> usize {
        self.state.lock().controller.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Number of lookups that found an entry.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Hits over lookups, or `None` before the first lookup.
    pub fn hit_ratio(&self) -> Option<f64> {
        let requests = self.requests();
        if requests == 0 {
            return None;
        }
        Some(self.hits() as f64 / requests as f64)
    }

    fn expire(&self, state: &mut CacheState) {
        let Some(interval) = self.flush_interval else {
            return;
        };
        if state.last_flush.elapsed() > interval {
            state.controller.flush();
            state.last_flush = Instant::now();
            debug!(cache = %self.id, ?interval, "flush interval elapsed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmap_value::Object;
    use std::sync::Arc;
    use std::thread;

    fn key(n: i32) -> CacheKey {
        let mut key = CacheKey::new();
        key.update_value(&Value::Int32(n));
        key
    }

    #[test]
    fn test_null_marker_distinct_from_absent() {
        let cache = CacheModel::from_def(&CacheModelDef::unbounded("c"), 10);
        assert_eq!(cache.get(&key(1)).unwrap(), None);
        cache.put(key(1), &Value::Null).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_hit_ratio() {
        let cache = CacheModel::from_def(&CacheModelDef::lru("c", 2), 10);
        assert_eq!(cache.hit_ratio(), None);

        cache.put(key(1), &Value::Int32(1)).unwrap();
        cache.get(&key(1)).unwrap();
        cache.get(&key(2)).unwrap();
        cache.get(&key(1)).unwrap();
        cache.get(&key(3)).unwrap();

        assert_eq!(cache.requests(), 4);
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.hit_ratio(), Some(0.5));
    }

    #[test]
    fn test_serialized_entries_roundtrip() {
        let cache = CacheModel::from_def(&CacheModelDef::unbounded("c").serialize(true), 10);
        let value = Value::from(Object::new("User").with("id", 1i64));
        cache.put(key(1), &value).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap(), Some(value));
    }

    #[test]
    fn test_flush_interval_checked_on_access() {
        let def = CacheModelDef::unbounded("c").flush_interval(Duration::from_millis(20));
        let cache = CacheModel::from_def(&def, 10);
        cache.put(key(1), &Value::Int32(1)).unwrap();
        assert!(cache.get(&key(1)).unwrap().is_some());

        thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(&key(1)).unwrap(), None);
    }

    #[test]
    fn test_default_capacity_applies() {
        let cache = CacheModel::from_def(&CacheModelDef::new("c", CachePolicy::Fifo), 1);
        cache.put(key(1), &Value::Int32(1)).unwrap();
        cache.put(key(2), &Value::Int32(2)).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key(1)).unwrap(), None);
    }

    #[test]
    fn test_snapshot_requirement() {
        let writable = CacheModel::from_def(&CacheModelDef::unbounded("c").read_only(false), 1);
        assert!(writable.needs_snapshot());
        let serialized = CacheModel::from_def(
            &CacheModelDef::unbounded("c").read_only(false).serialize(true),
            1,
        );
        assert!(!serialized.needs_snapshot());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(CacheModel::from_def(&CacheModelDef::lru("c", 16), 16));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.put(key(t * 100 + i), &Value::Int32(i)).unwrap();
                        cache.get(&key(t * 100 + i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 16);
        assert_eq!(cache.requests(), 400);
    }
}
