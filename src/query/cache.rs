use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use crate::core::error::{Error, Result};
use crate::core::stats::CacheStats;

/// Canonical identity of a query: operation name plus its parameters as
/// JSON with object keys sorted, so equal parameter sets always produce
/// the same key whatever order they were built in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<P: Serialize + ?Sized>(op: &str, params: &P) -> Result<Self> {
        // serde_json::Map is ordered by key, so the Value round-trip sorts
        let value = serde_json::to_value(params)?;
        Ok(CacheKey(format!("{}:{}", op, serde_json::to_string(&value)?)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.inserted_at + self.ttl
    }
}

/// Bounded LRU result cache with per-entry time-to-live.
///
/// Expiry is lazy: an expired entry is dropped when a lookup finds it.
/// `purge_expired` sweeps the rest.
pub struct ResultCache<V: Clone> {
    entries: Mutex<LruCache<CacheKey, CacheEntry<V>>>,
    capacity: usize,
    default_ttl: Duration,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    prewarm_success: AtomicU64,
    prewarm_failure: AtomicU64,
    prewarm_dropped: AtomicU64,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize, default_ttl: Duration) -> Result<Self> {
        let cap = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::invalid("cache capacity must be at least 1"))?;
        if default_ttl.is_zero() {
            return Err(Error::invalid("cache ttl must be positive"));
        }
        Ok(ResultCache {
            entries: Mutex::new(LruCache::new(cap)),
            capacity,
            default_ttl,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            prewarm_success: AtomicU64::new(0),
            prewarm_failure: AtomicU64::new(0),
            prewarm_dropped: AtomicU64::new(0),
        })
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let value = self.lookup(key, Instant::now());
        let counter = if value.is_some() { &self.hit_count } else { &self.miss_count };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Lookup that leaves the hit/miss counters alone.
    pub fn peek(&self, key: &CacheKey) -> Option<V> {
        self.lookup(key, Instant::now())
    }

    fn lookup(&self, key: &CacheKey, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock();
        let found = entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
        match found {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: CacheKey, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or replace; the least recently used entry is evicted when
    /// the cache is full.
    pub fn set_with_ttl(&self, key: CacheKey, value: V, ttl: Duration) {
        let entry = CacheEntry { value, inserted_at: Instant::now(), ttl };
        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                tracing::debug!(key = %evicted, "cache entry evicted");
            }
        }
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_prewarm_success(&self) {
        self.prewarm_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prewarm_failure(&self) {
        self.prewarm_failure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prewarm_dropped(&self) {
        self.prewarm_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.len(),
            capacity: self.capacity,
            prewarm_success: self.prewarm_success.load(Ordering::Relaxed),
            prewarm_failure: self.prewarm_failure.load(Ordering::Relaxed),
            prewarm_dropped: self.prewarm_dropped.load(Ordering::Relaxed),
        }
    }
}
