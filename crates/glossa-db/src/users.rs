//! User and API token repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use glossa_core::{
    AuthUser, CreateUserRequest, Error, NewApiToken, Result, User, UserCredentials,
    UserRepository,
};

use crate::errors::classify;

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Delete expired tokens. Returns the number removed.
    pub async fn purge_expired_tokens(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM api_token WHERE expires_at IS NOT NULL AND expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at
             FROM app_user
             WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| UserCredentials {
            user: user_from_row(&row),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn upsert_user(&self, req: CreateUserRequest) -> Result<User> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO app_user (name, email, password_hash, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $4)
             ON CONFLICT (LOWER(email)) DO UPDATE
             SET name = EXCLUDED.name,
                 password_hash = EXCLUDED.password_hash,
                 updated_at = EXCLUDED.updated_at
             RETURNING id, name, email, created_at",
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(user_from_row(&row))
    }

    async fn store_token(&self, token: NewApiToken) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO api_token (user_id, name, token_hash, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(token.user_id)
        .bind(&token.name)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }

    async fn find_token(&self, token_hash: &str) -> Result<Option<AuthUser>> {
        let row = sqlx::query(
            "UPDATE api_token k
             SET last_used_at = NOW()
             FROM app_user u
             WHERE k.token_hash = $1
               AND u.id = k.user_id
               AND (k.expires_at IS NULL OR k.expires_at > NOW())
             RETURNING k.id AS token_id, u.id, u.name, u.email, u.created_at",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| AuthUser {
            user: user_from_row(&row),
            token_id: row.get("token_id"),
        }))
    }

    async fn revoke_token(&self, token_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_token WHERE id = $1")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
