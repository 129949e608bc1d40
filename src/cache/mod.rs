//! Response caches for the source feeds.
//!
//! Entries are stamped with the injected clock on insert and considered stale
//! once their age reaches the TTL. Staleness is only checked on read; nothing
//! evicts entries in the background.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::utils::clock::{system_clock, Clock};

/// Thread-safe map with per-entry time-to-live.
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<K, (DateTime<Utc>, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self::with_clock(name, ttl, system_clock())
    }

    pub fn with_clock(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { name, ttl, clock, entries: RwLock::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let map = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let (stored_at, value) = map.get(key)?;
        let age = now.signed_duration_since(*stored_at).to_std().unwrap_or_default();
        if age < self.ttl {
            metrics::increment_counter!(crate::metrics::CACHE_HITS, "cache" => self.name);
            log::debug!("{} cache hit", self.name);
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key, (now, value));
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
