//! Cache keys.

use std::hash::{Hash, Hasher};

use sqlmap_value::Value;

const INITIAL_HASH: u64 = 17;
const MULTIPLIER: u64 = 37;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Order-sensitive fingerprint of one request.
///
/// Parts are folded in one at a time. Each part's own hash is weighted by
/// its position, so the same parts in a different order yield a different
/// running hash. Equality compares the running hash, the checksum, the part
/// count and finally the parts themselves.
#[derive(Debug, Clone)]
pub struct CacheKey {
    hash: u64,
    checksum: u64,
    count: u64,
    parts: Vec<Vec<u8>>,
}

impl CacheKey {
    pub fn new() -> Self {
        Self {
            hash: INITIAL_HASH,
            checksum: 0,
            count: 0,
            parts: Vec::new(),
        }
    }

    /// Fold in a raw part.
    pub fn update(&mut self, part: impl AsRef<[u8]>) -> &mut Self {
        let part = part.as_ref();
        let base = fnv1a(part);
        self.count += 1;
        self.checksum = self.checksum.wrapping_add(base);
        self.hash = self
            .hash
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(base.wrapping_mul(self.count));
        self.parts.push(part.to_vec());
        self
    }

    /// Fold in a value by its canonical encoding.
    pub fn update_value(&mut self, value: &Value) -> &mut Self {
        self.update(value.canonical_bytes())
    }

    /// Number of parts folded in.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.checksum == other.checksum
            && self.count == other.count
            && self.parts == other.parts
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key(parts: &[&str]) -> CacheKey {
        let mut key = CacheKey::new();
        for part in parts {
            key.update(part);
        }
        key
    }

    #[test]
    fn test_same_parts_same_key() {
        assert_eq!(key(&["getUser", "mock", "1"]), key(&["getUser", "mock", "1"]));
    }

    #[test]
    fn test_order_matters() {
        assert_ne!(key(&["a", "b"]), key(&["b", "a"]));
        assert_ne!(key(&["ab"]), key(&["a", "b"]));
    }

    #[test]
    fn test_values_fold_by_type() {
        let mut a = CacheKey::new();
        a.update_value(&Value::Int32(1));
        let mut b = CacheKey::new();
        b.update_value(&Value::Int64(1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_usable_as_hash_key() {
        let mut set = HashSet::new();
        set.insert(key(&["x", "1"]));
        assert!(set.contains(&key(&["x", "1"])));
        assert!(!set.contains(&key(&["x", "2"])));
        assert_eq!(key(&["x", "1"]).len(), 2);
    }
}
