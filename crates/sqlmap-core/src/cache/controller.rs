//! Eviction policies.

use std::collections::HashMap;

use linked_hash_map::LinkedHashMap;

use sqlmap_value::Value;

use super::key::CacheKey;

/// A stored cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// The request produced no object.
    Null,
    /// A shared copy of the result.
    Value(Value),
    /// A serialized snapshot, restored into a fresh copy on every hit.
    Serialized(Vec<u8>),
}

/// Storage and eviction order of a cache model.
///
/// Controllers are not synchronized; the owning model serializes access.
pub trait CacheController: Send {
    /// Look up an entry, updating recency where the policy tracks it.
    fn get(&mut self, key: &CacheKey) -> Option<CacheEntry>;

    /// Store an entry. Returns the key evicted to make room, if any.
    fn put(&mut self, key: CacheKey, entry: CacheEntry) -> Option<CacheKey>;

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry>;

    /// Drop every entry.
    fn flush(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps everything until flushed.
#[derive(Debug, Default)]
pub struct UnboundedController {
    entries: HashMap<CacheKey, CacheEntry>,
}

impl UnboundedController {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheController for UnboundedController {
    fn get(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: CacheKey, entry: CacheEntry) -> Option<CacheKey> {
        self.entries.insert(key, entry);
        None
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    fn flush(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Bounded store kept in eviction order. The front entry is evicted next.
#[derive(Debug)]
struct Bounded {
    capacity: usize,
    entries: LinkedHashMap<CacheKey, CacheEntry>,
}

impl Bounded {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: LinkedHashMap::new(),
        }
    }

    /// Replace an existing entry without moving it.
    fn replace(&mut self, key: &CacheKey, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries
            .get_mut(key)
            .map(|slot| std::mem::replace(slot, entry))
    }

    /// Append at the back, evicting from the front when over capacity.
    fn push(&mut self, key: CacheKey, entry: CacheEntry) -> Option<CacheKey> {
        self.entries.insert(key, entry);
        if self.entries.len() <= self.capacity {
            return None;
        }
        self.entries.pop_front().map(|(evicted, _)| evicted)
    }
}

/// Least-recently-used eviction. Hits and re-puts move a key to the back.
#[derive(Debug)]
pub struct LruController {
    inner: Bounded,
}

impl LruController {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Bounded::new(capacity),
        }
    }
}

impl CacheController for LruController {
    fn get(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.entries.get_refresh(key).cloned()
    }

    fn put(&mut self, key: CacheKey, entry: CacheEntry) -> Option<CacheKey> {
        if self.inner.entries.contains_key(&key) {
            self.inner.replace(&key, entry);
            self.inner.entries.get_refresh(&key);
            return None;
        }
        self.inner.push(key, entry)
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.entries.remove(key)
    }

    fn flush(&mut self) {
        self.inner.entries.clear();
    }

    fn len(&self) -> usize {
        self.inner.entries.len()
    }
}

/// First-in-first-out eviction. Access and re-puts never change the order.
#[derive(Debug)]
pub struct FifoController {
    inner: Bounded,
}

impl FifoController {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Bounded::new(capacity),
        }
    }
}

impl CacheController for FifoController {
    fn get(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.entries.get(key).cloned()
    }

    fn put(&mut self, key: CacheKey, entry: CacheEntry) -> Option<CacheKey> {
        if self.inner.entries.contains_key(&key) {
            self.inner.replace(&key, entry);
            return None;
        }
        self.inner.push(key, entry)
    }

    fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.entries.remove(key)
    }

    fn flush(&mut self) {
        self.inner.entries.clear();
    }

    fn len(&self) -> usize {
        self.inner.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(name: &str) -> CacheKey {
        let mut key = CacheKey::new();
        key.update(name);
        key
    }

    fn v(n: i32) -> CacheEntry {
        CacheEntry::Value(Value::Int32(n))
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let mut lru = LruController::new(2);
        lru.put(k("k1"), v(1));
        lru.put(k("k2"), v(2));
        assert_eq!(lru.put(k("k3"), v(3)), Some(k("k1")));
        assert!(lru.get(&k("k1")).is_none());
    }

    #[test]
    fn test_lru_read_protects_entry() {
        let mut lru = LruController::new(2);
        lru.put(k("k1"), v(1));
        lru.put(k("k2"), v(2));
        assert_eq!(lru.get(&k("k1")), Some(v(1)));
        assert_eq!(lru.put(k("k3"), v(3)), Some(k("k2")));
        assert!(lru.get(&k("k1")).is_some());
        assert!(lru.get(&k("k2")).is_none());
    }

    #[test]
    fn test_fifo_ignores_reads() {
        let mut fifo = FifoController::new(2);
        fifo.put(k("k1"), v(1));
        fifo.put(k("k2"), v(2));
        assert!(fifo.get(&k("k1")).is_some());
        assert_eq!(fifo.put(k("k3"), v(3)), Some(k("k1")));
        assert_eq!(fifo.len(), 2);
    }

    #[test]
    fn test_reput_replaces_without_growing() {
        let mut fifo = FifoController::new(2);
        fifo.put(k("k1"), v(1));
        assert_eq!(fifo.put(k("k1"), v(9)), None);
        assert_eq!(fifo.len(), 1);
        assert_eq!(fifo.get(&k("k1")), Some(v(9)));
    }

    #[test]
    fn test_fifo_reput_keeps_position() {
        let mut fifo = FifoController::new(2);
        fifo.put(k("k1"), v(1));
        fifo.put(k("k2"), v(2));
        fifo.put(k("k1"), v(10));
        assert_eq!(fifo.put(k("k3"), v(3)), Some(k("k1")));
        assert_eq!(fifo.get(&k("k2")), Some(v(2)));
    }

    #[test]
    fn test_lru_reput_refreshes_entry() {
        let mut lru = LruController::new(2);
        lru.put(k("k1"), v(1));
        lru.put(k("k2"), v(2));
        assert_eq!(lru.put(k("k1"), v(10)), None);
        assert_eq!(lru.put(k("k3"), v(3)), Some(k("k2")));
        assert_eq!(lru.get(&k("k1")), Some(v(10)));
        assert_eq!(lru.remove(&k("k3")), Some(v(3)));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_lru_many_hits_keep_capacity() {
        let mut lru = LruController::new(64);
        for i in 0..64 {
            lru.put(k(&i.to_string()), v(i));
        }
        for _ in 0..10 {
            for i in 0..64 {
                assert!(lru.get(&k(&i.to_string())).is_some());
            }
        }
        assert_eq!(lru.put(k("new"), v(-1)), Some(k("0")));
        assert_eq!(lru.len(), 64);
    }

    #[test]
    fn test_unbounded_and_flush() {
        let mut cache = UnboundedController::new();
        for i in 0..100 {
            cache.put(k(&i.to_string()), v(i));
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.remove(&k("5")), Some(v(5)));
        cache.flush();
        assert!(cache.is_empty());
        assert_eq!(cache.put(k("x"), CacheEntry::Null), None);
        assert_eq!(cache.get(&k("x")), Some(CacheEntry::Null));
    }
}
