//! Shared application state.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use glossa_core::{
    ExportCache, LocaleRepository, TagRepository, TranslationRepository, UserRepository,
};
use glossa_db::Database;

use crate::config::{RateLimitConfig, ServerConfig};
use crate::services::{
    AuthService, ExportCacheHandle, LocaleService, TagService, TranslationService,
};

pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Repository handles the services are built from.
#[derive(Clone)]
pub struct Repositories {
    pub locales: Arc<dyn LocaleRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub translations: Arc<dyn TranslationRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    /// Use one store for every repository.
    pub fn from_store<S>(store: S) -> Self
    where
        S: LocaleRepository
            + TagRepository
            + TranslationRepository
            + UserRepository
            + Clone
            + 'static,
    {
        Self {
            locales: Arc::new(store.clone()),
            tags: Arc::new(store.clone()),
            translations: Arc::new(store.clone()),
            users: Arc::new(store),
        }
    }
}

impl From<Database> for Repositories {
    fn from(db: Database) -> Self {
        Self {
            locales: Arc::new(db.locales),
            tags: Arc::new(db.tags),
            translations: Arc::new(db.translations),
            users: Arc::new(db.users),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub translations: TranslationService,
    pub locales: LocaleService,
    pub tags: TagService,
    pub auth: AuthService,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
    /// Name of the export cache backend, reported at startup.
    pub cache_backend: &'static str,
}

impl AppState {
    pub fn new(repos: Repositories, cache: Arc<dyn ExportCache>, config: &ServerConfig) -> Self {
        let cache = ExportCacheHandle::new(cache, config.export_cache_ttl);
        Self {
            translations: TranslationService::new(
                repos.translations,
                repos.locales.clone(),
                repos.tags.clone(),
                cache.clone(),
                config.allow_empty_values,
            ),
            locales: LocaleService::new(repos.locales, cache.clone()),
            tags: TagService::new(repos.tags),
            auth: AuthService::new(repos.users, config.token_ttl),
            rate_limiter: build_rate_limiter(&config.rate_limit),
            cache_backend: cache.backend(),
        }
    }
}

/// Direct (unkeyed) limiter allowing `requests` per `period`, or `None` when
/// disabled or misconfigured.
pub fn build_rate_limiter(config: &RateLimitConfig) -> Option<Arc<GlobalRateLimiter>> {
    if !config.enabled {
        return None;
    }
    let burst = NonZeroU32::new(config.requests)?;
    let quota = Quota::with_period(config.period / config.requests)?.allow_burst(burst);
    Some(Arc::new(RateLimiter::direct(quota)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rate_limiter_disabled() {
        let config = RateLimitConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(build_rate_limiter(&config).is_none());
    }

    #[test]
    fn test_rate_limiter_allows_burst_then_rejects() {
        let config = RateLimitConfig {
            enabled: true,
            requests: 3,
            period: Duration::from_secs(60),
        };
        let limiter = build_rate_limiter(&config).unwrap();
        for _ in 0..3 {
            assert!(limiter.check().is_ok());
        }
        assert!(limiter.check().is_err());
    }
}
