//! In-memory response caches keyed by normalized coordinates.
//!
//! Entries are never evicted; freshness is judged by the reader against
//! `fetched_at_millis`. One store holds one response kind.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

use chrono::Utc;
use parking_lot::Mutex;

use crate::location::CacheKey;

/// How long a cached response may be served without hitting the network.
pub const DEFAULT_CACHE_TTL_MS: i64 = 60 * 1000;

/// Source of "now" in epoch milliseconds.
pub trait Clock: Send + Sync + Debug {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Used by tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self { now: AtomicI64::new(start_millis) }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct CacheEntry<T> {
    pub value: Arc<T>,
    pub fetched_at_millis: i64,
}

// Manual impl: cloning an entry only bumps the Arc, T need not be Clone.
impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self { value: Arc::clone(&self.value), fetched_at_millis: self.fetched_at_millis }
    }
}

impl<T> CacheEntry<T> {
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis - self.fetched_at_millis
    }

    pub fn is_fresh(&self, now_millis: i64, ttl_millis: i64) -> bool {
        self.age_millis(now_millis) < ttl_millis
    }
}

#[derive(Debug)]
pub struct ResponseCache<T> {
    entries: Mutex<HashMap<CacheKey, CacheEntry<T>>>,
    clock: Arc<dyn Clock>,
}

impl<T> ResponseCache<T> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { entries: Mutex::new(HashMap::new()), clock }
    }

    /// Returns the entry for `key` regardless of its age.
    pub fn lookup(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        self.entries.lock().get(key).cloned()
    }

    /// Returns the entry only if it is younger than `ttl_millis`.
    pub fn lookup_fresh(&self, key: &CacheKey, ttl_millis: i64) -> Option<CacheEntry<T>> {
        let now = self.clock.now_millis();
        self.lookup(key).filter(|entry| entry.is_fresh(now, ttl_millis))
    }

    /// Insert or replace the entry for `key`, stamped with the current time.
    pub fn store(&self, key: CacheKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        let entry = CacheEntry { value: Arc::clone(&value), fetched_at_millis: self.clock.now_millis() };
        self.entries.lock().insert(key, entry);
        value
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
