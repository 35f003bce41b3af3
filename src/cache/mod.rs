//! Provider response caching
//!
//! Raw provider payloads are cached under a deterministic key so identical
//! searches do not hit the upstream provider twice within the TTL. The cache
//! is read-then-write with no locking: concurrent identical misses may both
//! populate an entry, and the last write wins.

use crate::search::{FilterSetting, Vertical};
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Delimiter between key components
pub const KEY_DELIMITER: &str = ":";

/// Deterministic cache key for a search request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for an external provider call. Order-sensitive; two logically
    /// identical requests always produce the same key.
    pub fn provider(
        formatted_query: &str,
        sources: &str,
        offset: u64,
        per_page: u32,
        highlighting: bool,
        filter_setting: FilterSetting,
    ) -> Self {
        Self::join(&[
            formatted_query.to_string(),
            sources.to_string(),
            offset.to_string(),
            per_page.to_string(),
            highlighting.to_string(),
            filter_setting.to_string(),
        ])
    }

    /// Key for an internal index call, scoped to the tenant
    pub fn internal(
        vertical: Vertical,
        query: &str,
        tenant: &str,
        page: u32,
        per_page: u32,
    ) -> Self {
        let prefix = match vertical {
            Vertical::Image => "oasis_image",
            _ => "odie",
        };
        Self::join(&[
            prefix.to_string(),
            query.to_string(),
            tenant.to_string(),
            page.to_string(),
            per_page.to_string(),
        ])
    }

    /// Key for a news search; `range` is the date range fragment
    pub fn news(
        tenant: &str,
        query: &str,
        channel: Option<u64>,
        range: &str,
        page: u32,
        per_page: u32,
    ) -> Self {
        Self::join(&[
            tenant.to_string(),
            query.to_string(),
            channel.map(|c| c.to_string()).unwrap_or_default(),
            range.to_string(),
            page.to_string(),
            per_page.to_string(),
        ])
    }

    fn join(parts: &[String]) -> Self {
        Self(parts.join(KEY_DELIMITER))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache backend errors. Callers treat every one of them as a miss.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Shared response cache collaborator
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    async fn setex(&self, key: &CacheKey, ttl: Duration, value: Vec<u8>) -> Result<(), CacheError>;
}

#[derive(Clone)]
struct CachedPayload {
    bytes: Vec<u8>,
    ttl: Duration,
}

struct PayloadExpiry;

impl Expiry<String, CachedPayload> for PayloadExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedPayload,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    /// A rewrite restarts the clock with the new payload's TTL
    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedPayload,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache with per-entry TTL
pub struct MemoryCache {
    cache: Cache<String, CachedPayload>,
}

impl MemoryCache {
    /// Create a new cache holding at most `max_capacity` payloads
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PayloadExpiry)
            .build();

        Self { cache }
    }

    /// Remove a cached payload
    pub async fn remove(&self, key: &CacheKey) {
        self.cache.remove(key.as_str()).await;
    }

    /// Clear the entire cache
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Get cache size
    pub fn size(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.cache.get(key.as_str()).await.map(|p| p.bytes))
    }

    async fn setex(&self, key: &CacheKey, ttl: Duration, value: Vec<u8>) -> Result<(), CacheError> {
        self.cache
            .insert(key.to_string(), CachedPayload { bytes: value, ttl })
            .await;
        Ok(())
    }
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

#[async_trait]
impl ResponseCache for NullCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    async fn setex(&self, _key: &CacheKey, _ttl: Duration, _value: Vec<u8>) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_key_is_deterministic() {
        let a = CacheKey::provider("(taxes) (site:irs.gov)", "Spell+Web", 0, 10, true, FilterSetting::Medium);
        let b = CacheKey::provider("(taxes) (site:irs.gov)", "Spell+Web", 0, 10, true, FilterSetting::Medium);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "(taxes) (site:irs.gov):Spell+Web:0:10:true:medium");
    }

    #[test]
    fn test_provider_keys_differ_on_each_component() {
        let base = CacheKey::provider("q", "Spell+Web", 0, 10, true, FilterSetting::Medium);
        let variants = [
            CacheKey::provider("q2", "Spell+Web", 0, 10, true, FilterSetting::Medium),
            CacheKey::provider("q", "Image", 0, 10, true, FilterSetting::Medium),
            CacheKey::provider("q", "Spell+Web", 10, 10, true, FilterSetting::Medium),
            CacheKey::provider("q", "Spell+Web", 0, 20, true, FilterSetting::Medium),
            CacheKey::provider("q", "Spell+Web", 0, 10, false, FilterSetting::Medium),
            CacheKey::provider("q", "Spell+Web", 0, 10, true, FilterSetting::High),
        ];
        for variant in variants {
            assert_ne!(base, variant);
        }
    }

    #[test]
    fn test_internal_image_key() {
        let key = CacheKey::internal(Vertical::Image, "element", "usagov", 4, 10);
        assert_eq!(key.as_str(), "oasis_image:element:usagov:4:10");
    }

    #[test]
    fn test_news_key() {
        let key = CacheKey::news("usagov", "element", Some(7), "2012-10-01..2012-10-31", 1, 10);
        assert_eq!(key.as_str(), "usagov:element:7:2012-10-01..2012-10-31:1:10");

        let key = CacheKey::news("usagov", "element", None, "", 1, 20);
        assert_eq!(key.as_str(), "usagov:element:::1:20");
    }

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryCache::new(100);
        let key = CacheKey::provider("q", "Spell+Web", 0, 10, true, FilterSetting::Off);
        assert_eq!(cache.get(&key).await.unwrap(), None);

        cache.setex(&key, Duration::from_secs(60), vec![1, 2, 3]).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(vec![1, 2, 3]));

        cache.remove(&key).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_cache_expires() {
        let cache = MemoryCache::new(100);
        let key = CacheKey::internal(Vertical::Web, "q", "t", 1, 10);
        cache
            .setex(&key, Duration::from_millis(50), b"payload".to_vec())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rewrite_restarts_ttl() {
        let cache = MemoryCache::new(100);
        let key = CacheKey::internal(Vertical::Web, "q", "t", 1, 10);
        cache
            .setex(&key, Duration::from_millis(100), b"first".to_vec())
            .await
            .unwrap();
        cache
            .setex(&key, Duration::from_secs(60), b"second".to_vec())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_null_cache_never_hits() {
        let cache = NullCache;
        let key = CacheKey::internal(Vertical::Web, "q", "t", 1, 10);
        cache.setex(&key, Duration::from_secs(60), vec![1]).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }
}
