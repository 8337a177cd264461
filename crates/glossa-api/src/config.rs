//! Server configuration from environment variables.
//!
//! `.env` files are loaded by the binaries via `dotenvy` before
//! [`ServerConfig::from_env`] runs.

use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use tracing::warn;

use glossa_core::{Error, Result, EXPORT_TTL_SECS};
use glossa_db::PoolConfig;

/// Default allowed CORS origins when `ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Longest accepted `EXPORT_CACHE_TTL`: 30 days.
pub const MAX_EXPORT_CACHE_TTL_SECS: u64 = 30 * 24 * 3600;

/// Longest accepted `TOKEN_TTL_HOURS`: 10 years.
pub const MAX_TOKEN_TTL_HOURS: i64 = 10 * 365 * 24;

/// Export cache backend selected by `CACHE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
    None,
}

impl FromStr for CacheBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            "none" | "off" | "disabled" => Ok(CacheBackend::None),
            other => Err(Error::Config(format!(
                "CACHE_BACKEND must be one of redis, memory, none (got '{}')",
                other
            ))),
        }
    }
}

/// Global request rate limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            period: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_pool: PoolConfig,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    /// Per-command timeout for Redis calls.
    pub redis_timeout: Duration,
    pub export_cache_ttl: u64,
    /// Accept blank translation values (the field must still be present).
    pub allow_empty_values: bool,
    /// Lifetime of issued API tokens; `None` means they never expire.
    pub token_ttl: Option<chrono::Duration>,
    pub allowed_origins: Vec<HeaderValue>,
    pub rate_limit: RateLimitConfig,
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/glossa".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            db_pool: PoolConfig::default(),
            cache_backend: CacheBackend::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            redis_timeout: Duration::from_millis(500),
            export_cache_ttl: EXPORT_TTL_SECS,
            allow_empty_values: false,
            token_ttl: None,
            allowed_origins: parse_allowed_origins(DEFAULT_ALLOWED_ORIGINS),
            rate_limit: RateLimitConfig::default(),
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset variables. Unparsable values are a `Config` error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let token_ttl = get("TOKEN_TTL_HOURS")
            .map(|v| {
                let hours: i64 = parse_value("TOKEN_TTL_HOURS", &v)?;
                parse_token_ttl(hours)
            })
            .transpose()?;

        let export_cache_ttl = parse_or(
            &get,
            "EXPORT_CACHE_TTL",
            parse_value,
            defaults.export_cache_ttl,
        )?;
        if export_cache_ttl == 0 || export_cache_ttl > MAX_EXPORT_CACHE_TTL_SECS {
            return Err(Error::Config(format!(
                "EXPORT_CACHE_TTL must be between 1 and {} seconds (got {})",
                MAX_EXPORT_CACHE_TTL_SECS, export_cache_ttl
            )));
        }

        let redis_timeout = Duration::from_millis(parse_or(
            &get,
            "REDIS_TIMEOUT_MS",
            parse_value,
            defaults.redis_timeout.as_millis() as u64,
        )?);
        if redis_timeout.is_zero() {
            return Err(Error::Config("REDIS_TIMEOUT_MS must be positive".to_string()));
        }

        let db_pool = PoolConfig::new()
            .max_connections(parse_or(
                &get,
                "DB_MAX_CONNECTIONS",
                parse_value,
                defaults.db_pool.max_connections,
            )?)
            .min_connections(parse_or(
                &get,
                "DB_MIN_CONNECTIONS",
                parse_value,
                defaults.db_pool.min_connections,
            )?)
            .acquire_timeout(Duration::from_secs(parse_or(
                &get,
                "DB_CONNECT_TIMEOUT_SECS",
                parse_value,
                defaults.db_pool.acquire_timeout.as_secs(),
            )?))
            .idle_timeout(Duration::from_secs(parse_or(
                &get,
                "DB_IDLE_TIMEOUT_SECS",
                parse_value,
                defaults.db_pool.idle_timeout.map_or(0, |d| d.as_secs()),
            )?));
        db_pool.check()?;

        let rate_limit = RateLimitConfig {
            enabled: parse_or(&get, "RATE_LIMIT_ENABLED", parse_bool, defaults.rate_limit.enabled)?,
            requests: parse_or(&get, "RATE_LIMIT_REQUESTS", parse_value, defaults.rate_limit.requests)?,
            period: Duration::from_secs(parse_or(
                &get,
                "RATE_LIMIT_PERIOD_SECS",
                parse_value,
                defaults.rate_limit.period.as_secs(),
            )?),
        };
        if rate_limit.enabled && (rate_limit.requests == 0 || rate_limit.period.is_zero()) {
            return Err(Error::Config(
                "RATE_LIMIT_REQUESTS and RATE_LIMIT_PERIOD_SECS must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", parse_value, defaults.port)?,
            db_pool,
            cache_backend: parse_or(&get, "CACHE_BACKEND", parse_value, defaults.cache_backend)?,
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            redis_timeout,
            export_cache_ttl,
            allow_empty_values: parse_or(
                &get,
                "ALLOW_EMPTY_VALUES",
                parse_bool,
                defaults.allow_empty_values,
            )?,
            token_ttl,
            allowed_origins: get("ALLOWED_ORIGINS")
                .map(|v| parse_allowed_origins(&v))
                .unwrap_or(defaults.allowed_origins),
            rate_limit,
            run_migrations: parse_or(&get, "RUN_MIGRATIONS", parse_bool, defaults.run_migrations)?,
        })
    }
}

fn parse_or<T, G, P>(get: &G, name: &str, parse: P, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    P: Fn(&str, &str) -> Result<T>,
{
    match get(name) {
        Some(raw) => parse(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value '{}'", name, raw)))
}

fn parse_token_ttl(hours: i64) -> Result<chrono::Duration> {
    if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
        return Err(Error::Config(format!(
            "TOKEN_TTL_HOURS must be between 1 and {} (got {})",
            MAX_TOKEN_TTL_HOURS, hours
        )));
    }
    chrono::Duration::try_hours(hours)
        .ok_or_else(|| Error::Config(format!("TOKEN_TTL_HOURS is out of range ({})", hours)))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{} must be a boolean (got '{}')", name, raw))),
    }
}

/// Parse a comma-separated CORS origin whitelist.
///
/// Invalid entries are skipped with a warning. An empty list falls back to
/// [`DEFAULT_ALLOWED_ORIGINS`].
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    let source = if raw.trim().is_empty() {
        DEFAULT_ALLOWED_ORIGINS
    } else {
        raw
    };

    source
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                warn!("Invalid CORS origin '{}': missing http(s) scheme", trimmed);
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.cache_backend, CacheBackend::Redis);
        assert_eq!(config.export_cache_ttl, 3600);
        assert!(!config.allow_empty_values);
        assert!(config.token_ttl.is_none());
        assert!(config.rate_limit.enabled);
        assert!(config.run_migrations);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("CACHE_BACKEND", "memory"),
            ("EXPORT_CACHE_TTL", "60"),
            ("ALLOW_EMPTY_VALUES", "true"),
            ("TOKEN_TTL_HOURS", "24"),
            ("RATE_LIMIT_ENABLED", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.export_cache_ttl, 60);
        assert!(config.allow_empty_values);
        assert_eq!(config.token_ttl, Some(chrono::Duration::hours(24)));
        assert!(!config.rate_limit.enabled);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("PORT")));

        let err = config_from(&[("CACHE_BACKEND", "memcached")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = config_from(&[("TOKEN_TTL_HOURS", "0")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_rate_limit_rejected_only_when_enabled() {
        assert!(config_from(&[("RATE_LIMIT_REQUESTS", "0")]).is_err());
        assert!(config_from(&[("RATE_LIMIT_REQUESTS", "0"), ("RATE_LIMIT_ENABLED", "false")]).is_ok());
    }

    #[test]
    fn test_export_cache_ttl_bounds() {
        let err = config_from(&[("EXPORT_CACHE_TTL", "0")]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("EXPORT_CACHE_TTL")));

        assert!(config_from(&[("EXPORT_CACHE_TTL", "18446744073709551615")]).is_err());
        let over = (MAX_EXPORT_CACHE_TTL_SECS + 1).to_string();
        assert!(config_from(&[("EXPORT_CACHE_TTL", over.as_str())]).is_err());

        let max = MAX_EXPORT_CACHE_TTL_SECS.to_string();
        let config = config_from(&[("EXPORT_CACHE_TTL", max.as_str())]).unwrap();
        assert_eq!(config.export_cache_ttl, MAX_EXPORT_CACHE_TTL_SECS);
    }

    #[test]
    fn test_token_ttl_bounds() {
        let err = config_from(&[("TOKEN_TTL_HOURS", "100000000000000")]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("TOKEN_TTL_HOURS")));
        assert!(config_from(&[("TOKEN_TTL_HOURS", "-5")]).is_err());

        let max = MAX_TOKEN_TTL_HOURS.to_string();
        let config = config_from(&[("TOKEN_TTL_HOURS", max.as_str())]).unwrap();
        let ttl = config.token_ttl.unwrap();
        assert!(chrono::Utc::now().checked_add_signed(ttl).is_some());
    }

    #[test]
    fn test_zero_redis_timeout_rejected() {
        assert!(config_from(&[("REDIS_TIMEOUT_MS", "0")]).is_err());
    }

    #[test]
    fn test_pool_settings() {
        let config = config_from(&[
            ("DB_MAX_CONNECTIONS", "20"),
            ("DB_MIN_CONNECTIONS", "2"),
            ("DB_CONNECT_TIMEOUT_SECS", "5"),
            ("DB_IDLE_TIMEOUT_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.db_pool.max_connections, 20);
        assert_eq!(config.db_pool.min_connections, 2);
        assert_eq!(config.db_pool.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.db_pool.idle_timeout, None);

        assert_eq!(config_from(&[]).unwrap().db_pool, PoolConfig::default());

        let err = config_from(&[("DB_MAX_CONNECTIONS", "2"), ("DB_MIN_CONNECTIONS", "4")]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("DB_MIN_CONNECTIONS")));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("PORT", "  "), ("HOST", "")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_parse_allowed_origins() {
        let origins = parse_allowed_origins("https://app.example.com, http://localhost:3000 ,");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0].to_str().unwrap(), "https://app.example.com");

        let origins = parse_allowed_origins("https://valid.com,not-a-url");
        assert_eq!(origins.len(), 1);

        assert!(!parse_allowed_origins("").is_empty());
    }
}
