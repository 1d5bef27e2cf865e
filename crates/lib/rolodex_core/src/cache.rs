//! In-memory TTL cache for directory responses.
//!
//! Constructed once and carried on the API state; handlers consult it
//! before hitting Okta or Graph and populate it after a successful fetch.
//! Entries expire individually; a background task sweeps out dead entries
//! so the map does not grow unbounded between reads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

/// Sweep interval for the background cleanup task.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub ttl_secs: u64,
}

/// Concurrent response cache with per-entry expiry.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl_secs: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_secs: AtomicU64::new(ttl_secs),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached value if present and unexpired. An expired entry counts
    /// as a miss and is dropped.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if Instant::now() < entry.expires_at {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };
        // The shard guard must be released before removing
        if expired {
            self.entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace a value, stamped with the current TTL.
    pub fn put(&self, key: impl Into<String>, value: serde_json::Value) {
        let ttl = Duration::from_secs(self.ttl_secs.load(Ordering::Relaxed));
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove a specific entry.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Remove all entries. Lifetime hit/miss counters keep running.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Current TTL in seconds.
    pub fn ttl(&self) -> u64 {
        self.ttl_secs.load(Ordering::Relaxed)
    }

    /// Change the TTL for entries inserted from now on.
    pub fn set_ttl(&self, secs: u64) {
        self.ttl_secs.store(secs, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ttl_secs: self.ttl(),
        }
    }

    /// Evict expired entries.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| now < entry.expires_at);
    }

    /// Spawn a periodic cleanup task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                cache.cleanup();
            }
        })
    }
}
