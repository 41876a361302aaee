use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Short-lived memo of whole snapshots, one entry per logical key.
///
/// Entries are replaced as a unit. Concurrent misses on the same key may each run `compute`;
/// the last write wins.
#[derive(Debug)]
pub struct TtlCache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T> Default for TtlCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Clone> TtlCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let guard = self.entries.read().await;
        guard
            .get(key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: &str, value: T, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(value) = self.get(key).await {
            tracing::debug!(key, "cache hit");
            return value;
        }

        tracing::debug!(key, "cache miss; recomputing");
        let value = compute().await;
        self.insert(key, value.clone(), ttl).await;
        value
    }

    pub async fn invalidate(&self, key: &str) {
        if self.entries.write().await.remove(key).is_some() {
            tracing::debug!(key, "cache entry invalidated");
        }
    }
}
