//! TTL cache for Adzuna search responses.
//!
//! Entries are keyed by `(query, country:location, page)` and are fresh for a
//! fixed TTL after insertion. Stale entries are evicted lazily on read.
//! `TtlCache` is per-process; `RedisSearchCache` is shared across instances.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::jobs::sources::adzuna::AdzunaJob;

/// Builds the cache key for one search page.
pub fn cache_key(query: &str, country: &str, location: Option<&str>, page: u32) -> String {
    format!(
        "{}|{}:{}|{}",
        query.trim().to_lowercase(),
        country,
        location.unwrap_or("").trim().to_lowercase(),
        page
    )
}

#[async_trait]
pub trait SearchCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Vec<AdzunaJob>>;
    async fn put(&self, key: &str, jobs: Vec<AdzunaJob>);
}

struct CacheEntry {
    data: Vec<AdzunaJob>,
    stored_at: Instant,
}

/// In-process cache guarded by an async mutex.
pub struct TtlCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SearchCache for TtlCache {
    async fn get(&self, key: &str) -> Option<Vec<AdzunaJob>> {
        let mut entries = self.entries.lock().await;
        let fresh = match entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() < self.ttl,
            None => return None,
        };
        if !fresh {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.data.clone())
    }

    async fn put(&self, key: &str, jobs: Vec<AdzunaJob>) {
        self.entries.lock().await.insert(
            key.to_string(),
            CacheEntry {
                data: jobs,
                stored_at: Instant::now(),
            },
        );
    }
}

/// Redis-backed cache. Expiry is delegated to `SET ... EX`.
/// Redis failures degrade to cache misses.
pub struct RedisSearchCache {
    client: redis::Client,
    ttl: Duration,
}

impl RedisSearchCache {
    pub fn new(client: redis::Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    fn redis_key(key: &str) -> String {
        format!("careerflow:adzuna:search:{key}")
    }
}

#[async_trait]
impl SearchCache for RedisSearchCache {
    async fn get(&self, key: &str) -> Option<Vec<AdzunaJob>> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Search cache unavailable, treating as miss: {e}");
                return None;
            }
        };
        let raw: Option<String> = match redis::cmd("GET")
            .arg(Self::redis_key(key))
            .query_async::<_, Option<String>>(&mut conn)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Search cache read failed: {e}");
                return None;
            }
        };
        raw.and_then(|payload| serde_json::from_str(&payload).ok())
    }

    async fn put(&self, key: &str, jobs: Vec<AdzunaJob>) {
        let payload = match serde_json::to_string(&jobs) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize search cache entry: {e}");
                return;
            }
        };
        let result = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            redis::cmd("SET")
                .arg(Self::redis_key(key))
                .arg(payload)
                .arg("EX")
                .arg(self.ttl.as_secs().max(1))
                .query_async::<_, ()>(&mut conn)
                .await
        }
        .await;
        if let Err(e) = result {
            warn!("Search cache write failed: {e}");
        }
    }
}
