//! Tag repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use glossa_core::{Error, Result, Tag, TagRepository};

use crate::errors::classify;

pub(crate) const TAG_COLUMNS: &str = "id, name, created_at, updated_at";

pub(crate) fn tag_from_row(row: &PgRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert any of `names` that do not exist yet and return all of them.
    pub async fn ensure(&self, names: &[&str]) -> Result<Vec<Tag>> {
        let now = Utc::now();
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();

        sqlx::query(
            "INSERT INTO tag (name, created_at, updated_at)
             SELECT name, $2, $2 FROM UNNEST($1::TEXT[]) AS name
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(&names)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM tag WHERE name = ANY($1) ORDER BY id",
            TAG_COLUMNS
        ))
        .bind(&names)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(tag_from_row).collect())
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn create(&self, name: &str) -> Result<Tag> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO tag (name, created_at, updated_at) VALUES ($1, $2, $2) RETURNING {}",
            TAG_COLUMNS
        ))
        .bind(name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(tag_from_row(&row))
    }

    async fn fetch(&self, id: i64) -> Result<Tag> {
        let row = sqlx::query(&format!("SELECT {} FROM tag WHERE id = $1", TAG_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref()
            .map(tag_from_row)
            .ok_or_else(|| Error::NotFound(format!("Tag {}", id)))
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query(&format!("SELECT {} FROM tag ORDER BY id", TAG_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    async fn update(&self, id: i64, name: &str) -> Result<Tag> {
        let row = sqlx::query(&format!(
            "UPDATE tag SET name = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            TAG_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.as_ref()
            .map(tag_from_row)
            .ok_or_else(|| Error::NotFound(format!("Tag {}", id)))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // translation_tag rows go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Tag {}", id)));
        }
        Ok(())
    }

    async fn missing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM tag WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect())
    }

    async fn name_taken(&self, name: &str, excluding: Option<i64>) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM tag
                WHERE name = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )",
        )
        .bind(name)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(taken)
    }
}
