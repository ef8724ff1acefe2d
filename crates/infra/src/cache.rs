//! Short-lived query result cache with write-based invalidation.
//!
//! Entries expire after a TTL and are also tagged with the store revision they
//! were computed at; a lookup at any other revision is a miss, so every write
//! invalidates everything cached before it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    revision: u64,
    cached_at: Instant,
}

#[derive(Debug)]
pub struct QueryCache<V> {
    entries: Mutex<HashMap<String, CachedEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
}

impl<V: Clone> QueryCache<V> {
    /// A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, 1024)
    }

    pub fn with_capacity(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key` at `revision`, if any.
    pub fn get(&self, key: &str, revision: u64) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.revision == revision && entry.cached_at.elapsed() < self.ttl => {
                tracing::debug!(key, revision, "query cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, revision: u64, value: V) {
        if !self.is_enabled() {
            return;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        let ttl = self.ttl;
        entries.retain(|_, e| e.revision == revision && e.cached_at.elapsed() < ttl);
        if entries.len() >= self.max_entries {
            // Still full of live entries: start over rather than track LRU.
            entries.clear();
        }
        entries.insert(
            key.into(),
            CachedEntry {
                value,
                revision,
                cached_at: Instant::now(),
            },
        );
    }

    /// Return the cached value or compute, cache and return a new one.
    /// Errors are never cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: &str,
        revision: u64,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(key, revision) {
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, revision, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn caches_until_revision_changes() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, ()>(calls.get())
        };

        assert_eq!(cache.get_or_try_insert_with("q", 1, compute), Ok(1));
        assert_eq!(cache.get_or_try_insert_with("q", 1, compute), Ok(1));
        assert_eq!(cache.get_or_try_insert_with("q", 2, compute), Ok(2));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn stale_revisions_are_pruned() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.insert("a", 1, 10);
        cache.insert("b", 1, 20);
        cache.insert("c", 2, 30);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("c", 2), Some(30));
    }

    #[test]
    fn zero_ttl_disables() {
        let cache = QueryCache::new(Duration::ZERO);
        assert!(!cache.is_enabled());
        cache.insert("a", 1, 1);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a", 1), None);
    }

    #[test]
    fn expired_entries_miss() {
        let cache = QueryCache::new(Duration::from_millis(10));
        cache.insert("a", 1, 1);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("a", 1), None);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache: QueryCache<u32> = QueryCache::new(Duration::from_secs(60));
        assert_eq!(cache.get_or_try_insert_with("a", 1, || Err("boom")), Err("boom"));
        assert!(cache.is_empty());
    }
}
