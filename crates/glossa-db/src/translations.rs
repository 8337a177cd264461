//! Translation repository implementation.
//!
//! Writes run in a single transaction covering the translation row and its
//! tag links. Reads load the page of translations first and the tags for the
//! whole page in one follow-up query.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Pool, Postgres, Row};
use tracing::debug;

use glossa_core::{
    Error, ExportPayload, Locale, NewTranslation, Page, PageRequest, Result, Tag, TagSync,
    Translation, TranslationChanges, TranslationFilter, TranslationFull, TranslationRepository,
};

use crate::errors::classify;
use crate::escape_like;

/// Bind parameter for dynamically assembled filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    BigInt(i64),
    Text(String),
}

/// A `WHERE` clause with its positional parameters (`$1..$n`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub where_clause: String,
    pub params: Vec<QueryParam>,
}

/// Translate search predicates into SQL over `translation t`.
///
/// Substring predicates are case-sensitive `LIKE` with the user input's
/// wildcards escaped.
pub fn build_filter(filter: &TranslationFilter) -> FilterClause {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if let Some(key) = &filter.key {
        params.push(QueryParam::Text(format!("%{}%", escape_like(key))));
        clauses.push(format!("t.key LIKE ${} ESCAPE '\\'", params.len()));
    }
    if let Some(content) = &filter.content {
        params.push(QueryParam::Text(format!("%{}%", escape_like(content))));
        clauses.push(format!("t.value LIKE ${} ESCAPE '\\'", params.len()));
    }
    if let Some(tag_id) = filter.tag_id {
        params.push(QueryParam::BigInt(tag_id));
        clauses.push(format!(
            "EXISTS (SELECT 1 FROM translation_tag tt WHERE tt.translation_id = t.id AND tt.tag_id = ${})",
            params.len()
        ));
    }
    if let Some(locale_id) = filter.locale_id {
        params.push(QueryParam::BigInt(locale_id));
        clauses.push(format!("t.locale_id = ${}", params.len()));
    }

    let where_clause = if clauses.is_empty() {
        "TRUE".to_string()
    } else {
        clauses.join(" AND ")
    };

    FilterClause {
        where_clause,
        params,
    }
}

const TRANSLATION_COLUMNS: &str = "id, locale_id, key, value, created_at, updated_at";

const FULL_SELECT: &str = r#"
    SELECT
        t.id, t.locale_id, t.key, t.value, t.created_at, t.updated_at,
        l.code AS locale_code,
        l.name AS locale_name,
        l.created_at AS locale_created_at,
        l.updated_at AS locale_updated_at
    FROM translation t
    JOIN locale l ON l.id = t.locale_id
"#;

fn translation_from_row(row: &PgRow) -> Translation {
    Translation {
        id: row.get("id"),
        locale_id: row.get("locale_id"),
        key: row.get("key"),
        value: row.get("value"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn locale_from_joined_row(row: &PgRow) -> Locale {
    Locale {
        id: row.get("locale_id"),
        code: row.get("locale_code"),
        name: row.get("locale_name"),
        created_at: row.get("locale_created_at"),
        updated_at: row.get("locale_updated_at"),
    }
}

/// Attach tags to joined translation rows, preserving row order.
async fn hydrate(conn: &mut PgConnection, rows: Vec<PgRow>) -> Result<Vec<TranslationFull>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.get("id")).collect();
    let mut tags_by_translation: HashMap<i64, Vec<Tag>> = HashMap::new();

    if !ids.is_empty() {
        let tag_rows = sqlx::query(
            r#"
            SELECT tt.translation_id, g.id, g.name, g.created_at, g.updated_at
            FROM translation_tag tt
            JOIN tag g ON g.id = tt.tag_id
            WHERE tt.translation_id = ANY($1)
            ORDER BY g.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::Database)?;

        for row in &tag_rows {
            tags_by_translation
                .entry(row.get("translation_id"))
                .or_default()
                .push(crate::tags::tag_from_row(row));
        }
    }

    Ok(rows
        .iter()
        .map(|row| {
            let translation = translation_from_row(row);
            let tags = tags_by_translation
                .remove(&translation.id)
                .unwrap_or_default();
            TranslationFull {
                locale: locale_from_joined_row(row),
                translation,
                tags,
            }
        })
        .collect())
}

async fn load_full(conn: &mut PgConnection, id: i64) -> Result<TranslationFull> {
    let row = sqlx::query(&format!("{} WHERE t.id = $1", FULL_SELECT))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Translation {}", id)))?;

    hydrate(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| Error::NotFound(format!("Translation {}", id)))
}

async fn attach_tags(conn: &mut PgConnection, translation_id: i64, tag_ids: &[i64]) -> Result<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO translation_tag (translation_id, tag_id)
         SELECT $1, tag_id FROM UNNEST($2::BIGINT[]) AS tag_id
         ON CONFLICT DO NOTHING",
    )
    .bind(translation_id)
    .bind(tag_ids)
    .execute(&mut *conn)
    .await
    .map_err(classify)?;
    Ok(())
}

/// PostgreSQL implementation of TranslationRepository.
#[derive(Clone)]
pub struct PgTranslationRepository {
    pool: Pool<Postgres>,
}

impl PgTranslationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TranslationRepository for PgTranslationRepository {
    async fn insert(&self, req: NewTranslation) -> Result<TranslationFull> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO translation (locale_id, key, value, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             RETURNING id",
        )
        .bind(req.locale_id)
        .bind(&req.key)
        .bind(&req.value)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        attach_tags(&mut tx, id, &req.tag_ids).await?;
        let full = load_full(&mut tx, id).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(full)
    }

    async fn fetch(&self, id: i64) -> Result<TranslationFull> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        load_full(&mut conn, id).await
    }

    async fn update(&self, id: i64, changes: TranslationChanges) -> Result<TranslationFull> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let locked: Option<i64> =
            sqlx::query_scalar("SELECT id FROM translation WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if locked.is_none() {
            return Err(Error::NotFound(format!("Translation {}", id)));
        }

        if changes.locale_id.is_some() || changes.key.is_some() || changes.value.is_some() {
            sqlx::query(
                "UPDATE translation
                 SET locale_id = COALESCE($2, locale_id),
                     key = COALESCE($3, key),
                     value = COALESCE($4, value),
                     updated_at = $5
                 WHERE id = $1",
            )
            .bind(id)
            .bind(changes.locale_id)
            .bind(changes.key.as_deref())
            .bind(changes.value.as_deref())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }

        if let Some(desired) = &changes.tag_ids {
            let current: Vec<i64> =
                sqlx::query_scalar("SELECT tag_id FROM translation_tag WHERE translation_id = $1")
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(Error::Database)?;

            let sync = TagSync::plan(&current, desired);
            if !sync.detach.is_empty() {
                sqlx::query(
                    "DELETE FROM translation_tag WHERE translation_id = $1 AND tag_id = ANY($2)",
                )
                .bind(id)
                .bind(&sync.detach)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            }
            attach_tags(&mut tx, id, &sync.attach).await?;

            debug!(
                subsystem = "db",
                component = "translations",
                op = "tag_sync",
                translation_id = id,
                attached = sync.attach.len(),
                detached = sync.detach.len(),
                "Synced translation tags"
            );
        }

        let full = load_full(&mut tx, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(full)
    }

    async fn delete(&self, id: i64) -> Result<Translation> {
        // translation_tag rows go with it via ON DELETE CASCADE
        let row = sqlx::query(&format!(
            "DELETE FROM translation WHERE id = $1 RETURNING {}",
            TRANSLATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref()
            .map(translation_from_row)
            .ok_or_else(|| Error::NotFound(format!("Translation {}", id)))
    }

    async fn key_exists(
        &self,
        locale_id: i64,
        key: &str,
        excluding: Option<i64>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM translation
                WHERE locale_id = $1 AND key = $2 AND ($3::BIGINT IS NULL OR id <> $3)
            )",
        )
        .bind(locale_id)
        .bind(key)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn search(
        &self,
        filter: &TranslationFilter,
        page: PageRequest,
    ) -> Result<Page<TranslationFull>> {
        let start = Instant::now();
        let clause = build_filter(filter);
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;

        let count_sql = format!(
            "SELECT COUNT(*) AS count FROM translation t WHERE {}",
            clause.where_clause
        );
        let mut count_q = sqlx::query(&count_sql);
        for param in &clause.params {
            count_q = match param {
                QueryParam::BigInt(v) => count_q.bind(v),
                QueryParam::Text(v) => count_q.bind(v),
            };
        }
        let total: i64 = count_q
            .fetch_one(&mut *conn)
            .await
            .map_err(Error::Database)?
            .get("count");

        if total == 0 {
            return Ok(Page::empty(page));
        }

        let limit_param = clause.params.len() + 1;
        let offset_param = clause.params.len() + 2;
        let page_sql = format!(
            "{} WHERE {} ORDER BY t.id ASC LIMIT ${} OFFSET ${}",
            FULL_SELECT, clause.where_clause, limit_param, offset_param
        );
        let mut page_q = sqlx::query(&page_sql);
        for param in &clause.params {
            page_q = match param {
                QueryParam::BigInt(v) => page_q.bind(v),
                QueryParam::Text(v) => page_q.bind(v),
            };
        }
        let rows = page_q
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::Database)?;

        let data = hydrate(&mut conn, rows).await?;

        debug!(
            subsystem = "db",
            component = "translations",
            op = "search",
            total = total,
            result_count = data.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Translation search complete"
        );

        Ok(Page::new(data, total, page))
    }

    async fn export_locale(&self, locale_id: i64) -> Result<ExportPayload> {
        let rows = sqlx::query("SELECT key, value FROM translation WHERE locale_id = $1")
            .bind(locale_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect())
    }

    async fn insert_bulk(&self, rows: Vec<NewTranslation>) -> Result<Vec<i64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut locale_ids = Vec::with_capacity(rows.len());
        let mut keys = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            locale_ids.push(row.locale_id);
            keys.push(row.key);
            values.push(row.value);
        }

        let ids: Vec<i64> = sqlx::query_scalar(
            "INSERT INTO translation (locale_id, key, value, created_at, updated_at)
             SELECT r.locale_id, r.key, r.value, $4, $4
             FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[]) AS r(locale_id, key, value)
             RETURNING id",
        )
        .bind(&locale_ids)
        .bind(&keys)
        .bind(&values)
        .bind(Utc::now())
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(ids)
    }

    async fn attach_tags_bulk(&self, pairs: &[(i64, i64)]) -> Result<u64> {
        if pairs.is_empty() {
            return Ok(0);
        }
        let (translation_ids, tag_ids): (Vec<i64>, Vec<i64>) = pairs.iter().copied().unzip();

        let result = sqlx::query(
            "INSERT INTO translation_tag (translation_id, tag_id)
             SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[])
             ON CONFLICT DO NOTHING",
        )
        .bind(&translation_ids)
        .bind(&tag_ids)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(result.rows_affected())
    }
}
