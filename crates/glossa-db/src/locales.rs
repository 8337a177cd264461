//! Locale repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use glossa_core::{CreateLocaleRequest, Error, Locale, LocaleRepository, Result, UpdateLocaleRequest};

use crate::errors::classify;

pub(crate) const LOCALE_COLUMNS: &str = "id, code, name, created_at, updated_at";

pub(crate) fn locale_from_row(row: &PgRow) -> Locale {
    Locale {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// PostgreSQL implementation of LocaleRepository.
#[derive(Clone)]
pub struct PgLocaleRepository {
    pool: Pool<Postgres>,
}

impl PgLocaleRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocaleRepository for PgLocaleRepository {
    async fn create(&self, req: CreateLocaleRequest) -> Result<Locale> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO locale (code, name, created_at, updated_at)
             VALUES ($1, $2, $3, $3)
             RETURNING {}",
            LOCALE_COLUMNS
        ))
        .bind(&req.code)
        .bind(&req.name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(locale_from_row(&row))
    }

    async fn fetch(&self, id: i64) -> Result<Locale> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Locale {}", id)))
    }

    async fn find(&self, id: i64) -> Result<Option<Locale>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM locale WHERE id = $1",
            LOCALE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(locale_from_row))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Locale>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM locale WHERE code = $1",
            LOCALE_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(locale_from_row))
    }

    async fn list(&self) -> Result<Vec<Locale>> {
        let rows = sqlx::query(&format!("SELECT {} FROM locale ORDER BY id", LOCALE_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(locale_from_row).collect())
    }

    async fn update(&self, id: i64, req: UpdateLocaleRequest) -> Result<Locale> {
        let row = sqlx::query(&format!(
            "UPDATE locale
             SET code = COALESCE($2, code),
                 name = COALESCE($3, name),
                 updated_at = $4
             WHERE id = $1
             RETURNING {}",
            LOCALE_COLUMNS
        ))
        .bind(id)
        .bind(req.code.as_deref())
        .bind(req.name.as_deref())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.as_ref()
            .map(locale_from_row)
            .ok_or_else(|| Error::NotFound(format!("Locale {}", id)))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM locale WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Locale {}", id)));
        }
        Ok(())
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM locale WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn code_taken(&self, code: &str, excluding: Option<i64>) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM locale
                WHERE code = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )",
        )
        .bind(code)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(taken)
    }
}
