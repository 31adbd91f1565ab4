//! TTL read-through cache for small reference datasets.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Read-through cache with per-entry expiry.
///
/// `get_or_load` returns the cached value while unexpired, otherwise awaits
/// the loader and caches its result. Loader failures are never cached, so a
/// failed load is retried on the next read. Mutating code paths call
/// `invalidate` so subsequent reads observe fresh data immediately rather
/// than after the TTL window.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, loading and caching it on miss
    /// or expiry.
    pub async fn get_or_load<E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key)
                && entry.expires_at > Instant::now()
            {
                return Ok(entry.value.clone());
            }
        }

        // The lock is not held across the load; concurrent misses may load
        // more than once, last write wins.
        let value = loader().await?;

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(value)
    }

    /// Forcibly evicts an entry.
    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Returns true if `key` is cached and unexpired.
    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn second_read_hits_cache() {
        let cache = TtlCache::new();
        let loads = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let loads = loads.clone();
            let value: Result<u32, Infallible> = cache
                .get_or_load("products", Duration::from_secs(60), || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value.unwrap(), 7);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_reloads() {
        let cache = TtlCache::new();
        let loads = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let loads = loads.clone();
            let _: Result<u32, Infallible> = cache
                .get_or_load("products", Duration::from_millis(5), || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let cache = TtlCache::new();
        let loads = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let loads = loads.clone();
            let _: Result<u32, Infallible> = cache
                .get_or_load("products", Duration::from_secs(60), || async move {
                    Ok(loads.fetch_add(1, Ordering::SeqCst))
                })
                .await;
            cache.invalidate("products").await;
        }

        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn loader_failure_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new();
        let loads = Arc::new(AtomicU32::new(0));

        let first: Result<u32, &str> = {
            let loads = loads.clone();
            cache
                .get_or_load("products", Duration::from_secs(60), || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Err("store down")
                })
                .await
        };
        assert!(first.is_err());
        assert!(!cache.contains("products").await);

        let second: Result<u32, &str> = {
            let loads = loads.clone();
            cache
                .get_or_load("products", Duration::from_secs(60), || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
        };
        assert_eq!(second.unwrap(), 7);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache = TtlCache::new();

        let a: Result<u32, Infallible> = cache
            .get_or_load("customers", Duration::from_secs(60), || async { Ok(1) })
            .await;
        let b: Result<u32, Infallible> = cache
            .get_or_load("products", Duration::from_secs(60), || async { Ok(2) })
            .await;
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);

        cache.invalidate("products").await;
        assert!(cache.contains("customers").await);
        assert!(!cache.contains("products").await);
    }
}
