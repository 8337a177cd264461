//! # glossa-db
//!
//! PostgreSQL database layer for glossa.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for locales, tags, translations and users
//! - Constraint-violation classification into domain errors
//! - Schema migrations (`migrations` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use glossa_db::{Database, NewTranslation, TranslationRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/glossa").await?;
//!
//!     let created = db.translations.insert(NewTranslation {
//!         locale_id: 1,
//!         key: "home.title".to_string(),
//!         value: "Welcome".to_string(),
//!         tag_ids: vec![],
//!     }).await?;
//!
//!     println!("Created translation: {}", created.translation.id);
//!     Ok(())
//! }
//! ```

mod errors;
pub mod locales;
pub mod pool;
pub mod tags;
pub mod test_fixtures;
pub mod translations;
pub mod users;

pub use locales::PgLocaleRepository;
pub use pool::{log_pool_metrics, open_pool, PoolConfig};
pub use tags::PgTagRepository;
pub use translations::{build_filter, FilterClause, PgTranslationRepository, QueryParam};
pub use users::PgUserRepository;

// Re-export core types
pub use glossa_core::*;

/// Escape LIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Combined database access.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub locales: PgLocaleRepository,
    pub tags: PgTagRepository,
    pub translations: PgTranslationRepository,
    /// Users and API tokens.
    pub users: PgUserRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            locales: PgLocaleRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            translations: PgTranslationRepository::new(pool.clone()),
            users: PgUserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = open_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Round-trip a trivial query to confirm the database answers.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
