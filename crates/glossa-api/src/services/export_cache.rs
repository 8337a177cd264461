//! Export cache plumbing: the Redis backend and the service-facing handle.
//!
//! ## Configuration
//!
//! - `CACHE_BACKEND`: `redis` (default), `memory` or `none`
//! - `REDIS_URL`: Redis connection URL (default: redis://localhost:6379)
//! - `REDIS_TIMEOUT_MS`: per-command timeout (default: 500)
//! - `EXPORT_CACHE_TTL`: entry TTL in seconds (default: 3600)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use glossa_core::{
    export_cache_key, Error, ExportCache, ExportPayload, MemoryExportCache, NoopExportCache,
    Result,
};

use crate::config::{CacheBackend, ServerConfig};

/// Redis-backed [`ExportCache`]. Payloads are stored as JSON strings.
#[derive(Clone)]
pub struct RedisExportCache {
    connection: ConnectionManager,
    timeout: Duration,
}

impl RedisExportCache {
    /// Connect to Redis. Fails if the server is unreachable within `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Cache(format!("invalid Redis URL: {}", e)))?;
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| Error::Cache("timed out connecting to Redis".to_string()))?
            .map_err(|e| Error::Cache(e.to_string()))?;
        Ok(Self {
            connection,
            timeout,
        })
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::Cache(format!("Redis {} timed out", op)))?
            .map_err(|e| Error::Cache(format!("Redis {} failed: {}", op, e)))
    }
}

#[async_trait]
impl ExportCache for RedisExportCache {
    async fn get(&self, key: &str) -> Result<Option<ExportPayload>> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = self.bounded("GET", conn.get(key)).await?;
        match raw {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &ExportPayload, ttl_secs: u64) -> Result<()> {
        let serialized = serde_json::to_string(payload)?;
        let mut conn = self.connection.clone();
        self.bounded::<(), _>("SET", conn.set_ex(key, serialized, ttl_secs))
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        self.bounded::<(), _>("DEL", conn.del(key)).await
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

/// Build the export cache selected by configuration.
///
/// An unreachable Redis degrades to no caching rather than failing startup.
pub async fn build_export_cache(config: &ServerConfig) -> Arc<dyn ExportCache> {
    match config.cache_backend {
        CacheBackend::Redis => {
            match RedisExportCache::connect(&config.redis_url, config.redis_timeout).await {
                Ok(cache) => {
                    info!(
                        subsystem = "cache",
                        component = "export_cache",
                        ttl_secs = config.export_cache_ttl,
                        "Redis export cache enabled"
                    );
                    Arc::new(cache)
                }
                Err(e) => {
                    warn!(
                        subsystem = "cache",
                        component = "export_cache",
                        error = %e,
                        "Failed to connect to Redis, export cache disabled"
                    );
                    Arc::new(NoopExportCache)
                }
            }
        }
        CacheBackend::Memory => {
            info!(subsystem = "cache", "In-process export cache enabled");
            Arc::new(MemoryExportCache::new())
        }
        CacheBackend::None => {
            info!(subsystem = "cache", "Export cache disabled via CACHE_BACKEND=none");
            Arc::new(NoopExportCache)
        }
    }
}

/// Service-facing wrapper around an [`ExportCache`].
///
/// Backend failures never fail a request: read errors count as misses and
/// write/delete errors are logged.
#[derive(Clone)]
pub struct ExportCacheHandle {
    cache: Arc<dyn ExportCache>,
    ttl_secs: u64,
}

impl ExportCacheHandle {
    pub fn new(cache: Arc<dyn ExportCache>, ttl_secs: u64) -> Self {
        Self { cache, ttl_secs }
    }

    pub fn backend(&self) -> &'static str {
        self.cache.backend()
    }

    pub async fn lookup(&self, code: &str) -> Option<ExportPayload> {
        let key = export_cache_key(code);
        match self.cache.get(&key).await {
            Ok(Some(payload)) => {
                debug!(subsystem = "cache", cache_key = %key, "Export cache HIT");
                Some(payload)
            }
            Ok(None) => {
                debug!(subsystem = "cache", cache_key = %key, "Export cache MISS");
                None
            }
            Err(e) => {
                warn!(subsystem = "cache", cache_key = %key, error = %e, "Export cache read failed");
                None
            }
        }
    }

    pub async fn store(&self, code: &str, payload: &ExportPayload) {
        let key = export_cache_key(code);
        if let Err(e) = self.cache.set(&key, payload, self.ttl_secs).await {
            warn!(subsystem = "cache", cache_key = %key, error = %e, "Export cache write failed");
        }
    }

    pub async fn invalidate(&self, code: &str) {
        let key = export_cache_key(code);
        match self.cache.delete(&key).await {
            Ok(()) => debug!(subsystem = "cache", cache_key = %key, "Export cache INVALIDATE"),
            Err(e) => {
                warn!(subsystem = "cache", cache_key = %key, error = %e, "Export cache invalidation failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cache whose every call fails.
    struct BrokenCache;

    #[async_trait]
    impl ExportCache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<ExportPayload>> {
            Err(Error::Cache("down".to_string()))
        }
        async fn set(&self, _key: &str, _payload: &ExportPayload, _ttl: u64) -> Result<()> {
            Err(Error::Cache("down".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(Error::Cache("down".to_string()))
        }
        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_handle_tolerates_backend_failures() {
        let handle = ExportCacheHandle::new(Arc::new(BrokenCache), 60);
        assert!(handle.lookup("en").await.is_none());
        handle.store("en", &ExportPayload::new()).await;
        handle.invalidate("en").await;
    }

    #[tokio::test]
    async fn test_handle_round_trip_on_memory_backend() {
        let handle = ExportCacheHandle::new(Arc::new(MemoryExportCache::new()), 60);
        let mut payload = ExportPayload::new();
        payload.insert("a".to_string(), "1".to_string());

        handle.store("en", &payload).await;
        assert_eq!(handle.lookup("en").await, Some(payload));
        handle.invalidate("en").await;
        assert!(handle.lookup("en").await.is_none());
    }

    #[tokio::test]
    async fn test_build_export_cache_selects_backend() {
        let mut config = ServerConfig::default();
        config.cache_backend = CacheBackend::Memory;
        assert_eq!(build_export_cache(&config).await.backend(), "memory");

        config.cache_backend = CacheBackend::None;
        assert_eq!(build_export_cache(&config).await.backend(), "none");
    }
}
