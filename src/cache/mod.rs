//! Pluggable page caches for rendered HTML.
//!
//! The crate ships with two built-in caches:
//!
//! - [`MemoryCache`] -- in-process map with a fixed TTL and lazy expiry.
//! - [`NoopCache`] -- stores nothing; every lookup misses.
//!
//! Implement the [`PageCache`] trait to plug in your own store.

mod memory;

pub use memory::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL, MemoryCache};

use std::future::Future;

/// Trait for caches that hold rendered pages keyed by target url.
///
/// Expiry is the cache's own policy: `get` must never return a value whose
/// TTL has elapsed. Implementations must be `Send + Sync + 'static` so they
/// can be shared across request handlers.
///
/// # Implementing a custom cache
///
/// ```rust,no_run
/// use manga_proxy::PageCache;
///
/// struct MyCache;
///
/// impl PageCache for MyCache {
///     async fn get(&self, key: &str) -> Option<String> {
///         // look the page up somewhere ...
///         None
///     }
///
///     async fn set(&self, key: &str, value: String) {
///         // store it ...
///     }
/// }
/// ```
pub trait PageCache: Send + Sync + 'static {
    /// Return the live value stored under `key`, if any.
    fn get(&self, key: &str) -> impl Future<Output = Option<String>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = ()> + Send;
}

/// A cache that never stores anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;

impl PageCache for NoopCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_cache_always_misses() {
        let cache = NoopCache;
        cache.set("https://example.com/", "<p>hi</p>".into()).await;
        assert_eq!(cache.get("https://example.com/").await, None);
    }
}
