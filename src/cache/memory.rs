//! In-memory TTL cache.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::PageCache;

/// How long a rendered page stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Number of inserts between two sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: usize = 128;

struct Entry {
    value: String,
    inserted_at: Instant,
}

/// Thread-safe in-memory cache with one TTL for every entry.
///
/// Expired entries are evicted when they are looked up, and every
/// [`DEFAULT_SWEEP_INTERVAL`] inserts the whole map is swept so pages that
/// are never requested again do not pile up. Call
/// [`evict_expired`](Self::evict_expired) to purge them eagerly.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use manga_proxy::{MemoryCache, PageCache};
///
/// # async fn example() {
/// let cache = MemoryCache::new(Duration::from_secs(60));
/// cache.set("https://example.com/", "<p>page</p>".into()).await;
/// assert_eq!(cache.get("https://example.com/").await.as_deref(), Some("<p>page</p>"));
/// # }
/// ```
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    sweep_interval: usize,
    inserts: AtomicUsize,
}

impl MemoryCache {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            inserts: AtomicUsize::new(0),
        }
    }

    /// Sweep expired entries every `inserts` calls to `set` instead of every
    /// [`DEFAULT_SWEEP_INTERVAL`]. Zero is treated as one.
    pub fn with_sweep_interval(mut self, inserts: usize) -> Self {
        self.sweep_interval = inserts.max(1);
        self
    }

    /// The TTL applied to every entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every entry whose TTL has elapsed.
    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            tracing::trace!("Swept {evicted} expired entries");
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl PageCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            return Some(entry.value.clone());
        }
        drop(entry);
        // re-check under the write lock; a concurrent set may have refreshed it
        if self
            .entries
            .remove_if(key, |_, entry| entry.inserted_at.elapsed() >= self.ttl)
            .is_some()
        {
            tracing::trace!("Evicted expired entry for {key}");
        }
        None
    }

    async fn set(&self, key: &str, value: String) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );

        let inserts = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if inserts % self.sweep_interval == 0 {
            self.evict_expired();
        }
    }
}
