// FICHIER : src-app/src/store/cache.rs

//! Cache LRU thread-safe des documents lus sur disque, avec TTL optionnel.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    expires_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct Cache<K: Hash + Eq, V> {
    // Mutex : un `get` LRU réordonne les entrées
    slots: Arc<Mutex<LruCache<K, Slot<V>>>>,
    ttl: Option<Duration>,
    counters: Arc<Counters>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Une capacité nulle est ramenée à 1.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Arc::new(Mutex::new(LruCache::new(cap))),
            ttl,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let found = self.lookup(key);
        let counter = if found.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn lookup(&self, key: &K) -> Option<V> {
        let mut guard = self.slots.lock().ok()?;
        let expired = match guard.get(key) {
            None => return None,
            Some(slot) => match slot.expires_at {
                Some(deadline) if Instant::now() > deadline => true,
                _ => return Some(slot.value.clone()),
            },
        };
        if expired {
            guard.pop(key);
        }
        None
    }

    pub fn put(&self, key: K, value: V) {
        let slot = Slot {
            value,
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        };
        if let Ok(mut guard) = self.slots.lock() {
            guard.put(key, slot);
        }
    }

    pub fn remove(&self, key: &K) {
        if let Ok(mut guard) = self.slots.lock() {
            guard.pop(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.slots.lock() {
            guard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}
