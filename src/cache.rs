//! Schedule cache contract and in-memory implementation.
//!
//! The cache stores canonical-JSON response payloads keyed by problem
//! fingerprint. Reads and writes are independent single-key operations
//! with last-write-wins semantics, which is safe here because solve
//! outcomes are deterministic up to score ties. Cache failures must never
//! fail a solve; the engine logs and continues.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A cache write/read failure (transport-level, never a miss).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheError(pub String);

/// Byte-oriented schedule cache: get / put / delete with TTL.
pub trait ScheduleCache: Send + Sync {
    /// Looks up a value. `None` is a miss.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores a value for `ttl`. Last write wins.
    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Invalidates a key.
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Process-local cache with per-entry expiry.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly expired, not yet evicted) entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScheduleCache for InMemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError("cache lock poisoned".into()))?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError("cache lock poisoned".into()))?;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError("cache lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(3600);

    #[test]
    fn test_put_get_roundtrip() {
        let cache = InMemoryCache::new();
        cache.put("k", b"payload".to_vec(), TTL).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(b"payload".to_vec()));
        assert_eq!(cache.get("missing").unwrap(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = InMemoryCache::new();
        cache.put("k", b"first".to_vec(), TTL).unwrap();
        cache.put("k", b"second".to_vec(), TTL).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(b"second".to_vec()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete() {
        let cache = InMemoryCache::new();
        cache.put("k", b"v".to_vec(), TTL).unwrap();
        cache.delete("k").unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_expired_entry_is_miss() {
        let cache = InMemoryCache::new();
        cache.put("k", b"v".to_vec(), Duration::ZERO).unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
        // The expired entry was evicted on read.
        assert!(cache.is_empty());
    }
}
