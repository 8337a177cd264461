//! PostgreSQL pool sizing and health logging.
//!
//! Every knob here maps onto a `DB_*` variable read by the server config:
//!
//! | Variable                   | Field              | Default |
//! |----------------------------|--------------------|---------|
//! | `DB_MAX_CONNECTIONS`       | `max_connections`  | 10      |
//! | `DB_MIN_CONNECTIONS`       | `min_connections`  | 0       |
//! | `DB_CONNECT_TIMEOUT_SECS`  | `acquire_timeout`  | 30      |
//! | `DB_IDLE_TIMEOUT_SECS`     | `idle_timeout`     | 600 (0 keeps idle connections) |

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use glossa_core::{Error, Result};

/// Sizing and timeouts for the translation database pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// Connections kept open even when idle; the seeder and tests use 0.
    pub min_connections: u32,
    /// How long a request waits for a free connection before failing.
    pub acquire_timeout: Duration,
    /// Idle connections above `min_connections` are closed after this; `None` keeps them.
    pub idle_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    pub fn min_connections(mut self, n: u32) -> Self {
        self.min_connections = n;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// A zero duration disables idle reaping.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Reject sizings sqlx would either panic on or never satisfy.
    pub fn check(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::Config("DB_MAX_CONNECTIONS must be positive".to_string()));
        }
        if self.min_connections > self.max_connections {
            return Err(Error::Config(format!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.acquire_timeout.is_zero() {
            return Err(Error::Config("DB_CONNECT_TIMEOUT_SECS must be positive".to_string()));
        }
        Ok(())
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
    }
}

/// Open a pool against `database_url` sized by `config`.
pub async fn open_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    config.check()?;
    let start = Instant::now();

    let pool = config
        .options()
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "open",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        idle_timeout_secs = config.idle_timeout.map(|d| d.as_secs()),
        duration_ms = start.elapsed().as_millis() as u64,
        "Translation database pool open"
    );
    Ok(pool)
}

/// Log pool occupancy; warns when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();
    debug!(subsystem = "db", component = "pool", pool_size = size, pool_idle = idle, "Pool occupancy");

    if size > 0 && idle == 0 {
        warn!(
            subsystem = "db",
            component = "pool",
            pool_size = size,
            "All pooled connections are busy; raise DB_MAX_CONNECTIONS if this persists"
        );
    }
}
