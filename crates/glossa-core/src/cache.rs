//! Export cache keys and the in-process cache backends.
//!
//! The Redis backend lives in `glossa-api`; the backends here cover local
//! development (`CACHE_BACKEND=memory`), deployments without a cache
//! (`CACHE_BACKEND=none`) and the test suites.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ExportPayload;
use crate::traits::ExportCache;

/// Prefix for export cache keys.
pub const EXPORT_KEY_PREFIX: &str = "glossa:export:";

/// Default export cache TTL in seconds.
pub const EXPORT_TTL_SECS: u64 = 3600;

/// Cache key holding the export payload for a locale code.
pub fn export_cache_key(code: &str) -> String {
    format!("{}{}", EXPORT_KEY_PREFIX, code)
}

struct Entry {
    payload: ExportPayload,
    expires_at: Instant,
}

/// Process-local export cache with per-entry expiry.
///
/// Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct MemoryExportCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryExportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.get(key).await.map(|v| v.is_some()).unwrap_or(false)
    }
}

#[async_trait]
impl ExportCache for MemoryExportCache {
    async fn get(&self, key: &str) -> Result<Option<ExportPayload>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.payload.clone()))
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
            debug!(
                subsystem = "cache",
                component = "memory",
                cache_key = key,
                "Expired export entry evicted"
            );
        }
        Ok(None)
    }

    async fn set(&self, key: &str, payload: &ExportPayload, ttl_secs: u64) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| Error::Cache(format!("TTL of {}s is out of range", ttl_secs)))?;
        let entry = Entry {
            payload: payload.clone(),
            expires_at,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Cache that stores nothing; every read is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExportCache;

#[async_trait]
impl ExportCache for NoopExportCache {
    async fn get(&self, _key: &str) -> Result<Option<ExportPayload>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _payload: &ExportPayload, _ttl_secs: u64) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "none"
    }
}
