//! Bounded FIFO cache with optional TTL.
//!
//! Shared by the embedding backends, the QA answer cache, the service
//! summary cache and the session store. Eviction is strictly oldest-first
//! by insertion; a `get` does not refresh an entry.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Thread-safe bounded cache keyed by string.
pub struct BoundedCache<V> {
    inner: Mutex<CacheInner<V>>,
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    order: VecDeque<String>,
    max_size: usize,
    ttl: Option<Duration>,
}

impl<V> CacheInner<V> {
    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        self.ttl.is_some_and(|ttl| entry.inserted_at.elapsed() >= ttl)
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry.value)
    }
}

impl<V: Clone> BoundedCache<V> {
    /// Create a cache without expiry. Capacity is clamped to at least 1.
    pub fn new(max_size: usize) -> Self {
        Self::build(max_size, None)
    }

    /// Create a cache whose entries expire `ttl` after insertion.
    pub fn with_ttl(max_size: usize, ttl: Duration) -> Self {
        Self::build(max_size, Some(ttl))
    }

    fn build(max_size: usize, ttl: Option<Duration>) -> Self {
        let max_size = max_size.max(1);
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(max_size),
                order: VecDeque::with_capacity(max_size),
                max_size,
                ttl,
            }),
        }
    }

    /// Get a cached value. Returns None on miss or expired entry.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let expired = inner.entries.get(key).map(|e| inner.is_expired(e))?;
        if expired {
            inner.remove(key);
            return None;
        }
        inner.entries.get(key).map(|e| e.value.clone())
    }

    /// Insert a value, evicting the oldest entries when full. Re-inserting
    /// an existing key replaces it and moves it to the back of the queue.
    pub fn put(&self, key: String, value: V) {
        let mut inner = self.inner.lock();
        inner.remove(&key);

        while inner.entries.len() >= inner.max_size {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Remove and return an entry.
    pub fn take(&self, key: &str) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Drop all expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| inner.is_expired(e))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().max_size
    }

    /// Number of entries in the cache (expired ones included until touched).
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_and_miss() {
        let cache = BoundedCache::new(10);
        assert!(cache.get("hello").is_none());

        cache.put("hello".into(), vec![1.0f32, 2.0, 3.0]);
        assert_eq!(cache.get("hello"), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fifo_eviction_ignores_reads() {
        let cache = BoundedCache::new(2);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        // Reading "a" does not protect it
        assert_eq!(cache.get("a"), Some(1));

        cache.put("c".into(), 3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_reinsert_moves_to_back() {
        let cache = BoundedCache::new(2);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        cache.put("a".into(), 10);
        cache.put("c".into(), 3);
        assert_eq!(cache.get("a"), Some(10));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = BoundedCache::with_ttl(10, Duration::from_millis(1));
        cache.put("ephemeral".into(), 1);
        cache.put("other".into(), 2);

        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("ephemeral").is_none());
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_take_and_clear() {
        let cache = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put("k".into(), "v".to_string());
        assert_eq!(cache.take("k").as_deref(), Some("v"));
        assert!(cache.take("k").is_none());
        cache.put("k".into(), "v".to_string());
        cache.clear();
        assert!(cache.is_empty());
    }
}
