//! Cache model descriptors.

use std::time::Duration;

/// Eviction policy of a cache model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Entries are only removed by flushes.
    Unbounded,
    /// Evict the least recently used entry.
    Lru,
    /// Evict the oldest inserted entry.
    Fifo,
}

/// Configuration of a per-statement cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheModelDef {
    pub id: String,
    pub policy: CachePolicy,
    /// Bound for LRU/FIFO; the mapper default applies when unset.
    pub capacity: Option<usize>,
    /// Callers treat cached results as shared and never mutate them.
    pub read_only: bool,
    /// Store results as serialized bytes and hand out fresh copies.
    pub serialize: bool,
    pub flush_interval: Option<Duration>,
    /// Statements whose execution flushes this cache.
    pub flush_on_execute: Vec<String>,
}

impl CacheModelDef {
    pub fn new(id: impl Into<String>, policy: CachePolicy) -> Self {
        Self {
            id: id.into(),
            policy,
            capacity: None,
            read_only: true,
            serialize: false,
            flush_interval: None,
            flush_on_execute: Vec::new(),
        }
    }

    pub fn lru(id: impl Into<String>, capacity: usize) -> Self {
        Self::new(id, CachePolicy::Lru).capacity(capacity)
    }

    pub fn fifo(id: impl Into<String>, capacity: usize) -> Self {
        Self::new(id, CachePolicy::Fifo).capacity(capacity)
    }

    pub fn unbounded(id: impl Into<String>) -> Self {
        Self::new(id, CachePolicy::Unbounded)
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn serialize(mut self, serialize: bool) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    pub fn flush_on_execute(mut self, statement: impl Into<String>) -> Self {
        self.flush_on_execute.push(statement.into());
        self
    }
}
