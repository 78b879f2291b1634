//! TTL-bound in-memory cache.
//!
//! Explicitly scoped: constructed once and handed to the collaborators
//! that need it, never reached through global state. Entries expire after
//! a fixed time-to-live and are dropped lazily on read.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A keyed cache where every entry expires `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, (Instant, V)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a fresh entry, or None if absent or expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((inserted, value)) if inserted.elapsed() < self.ttl => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(key, (Instant::now(), value));
    }

    /// Drop one entry, forcing the next read to miss.
    pub async fn invalidate(&self, key: &K) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }

    /// Remove every expired entry. Called opportunistically by owners
    /// with long-lived caches; reads never depend on it.
    pub async fn purge_expired(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, (inserted, _)| inserted.elapsed() < self.ttl);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
