//! Token authentication.
//!
//! Login exchanges an email/password pair for an opaque bearer token. The
//! plaintext token is returned once; only its SHA-256 digest is stored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use glossa_core::credentials;
use glossa_core::validation::LOGIN_RULES;
use glossa_core::{
    validate, AuthUser, CreateUserRequest, Error, FieldValue, Mode, NewApiToken, Result, User,
    UserRepository,
};

/// Message shown for any failed login, whether the email or the password was wrong.
pub const BAD_CREDENTIALS_MESSAGE: &str = "The provided credentials are incorrect.";

/// Message returned when a request lacks a valid bearer token.
pub const UNAUTHENTICATED_MESSAGE: &str = "Unauthenticated.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    token_ttl: Option<chrono::Duration>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, token_ttl: Option<chrono::Duration>) -> Self {
        Self { users, token_ttl }
    }

    /// Verify credentials and issue a new token.
    pub async fn login(&self, payload: LoginPayload) -> Result<String> {
        validate(
            LOGIN_RULES,
            Mode::Full,
            &[
                ("email", FieldValue::text(payload.email.as_deref())),
                ("password", FieldValue::text(payload.password.as_deref())),
            ],
        )
        .into_result()?;
        let (Some(email), Some(password)) = (payload.email, payload.password) else {
            return Err(Error::Internal("validated payload missing fields".to_string()));
        };

        let Some(creds) = self.users.find_by_email(&email).await? else {
            debug!(subsystem = "auth", "Login for unknown email");
            return Err(Error::invalid_field("email", BAD_CREDENTIALS_MESSAGE));
        };

        // Argon2 is CPU-bound; keep it off the async workers.
        let stored = creds.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || credentials::verify_password(&password, &stored))
                .await
                .map_err(|e| Error::Internal(format!("password verification task: {}", e)))??;
        if !verified {
            warn!(subsystem = "auth", user_id = creds.user.id, "Login with wrong password");
            return Err(Error::invalid_field("email", BAD_CREDENTIALS_MESSAGE));
        }

        let expires_at = token_expiry(Utc::now(), self.token_ttl)?;
        let token = credentials::generate_token();
        self.users
            .store_token(NewApiToken {
                user_id: creds.user.id,
                name: "api".to_string(),
                token_hash: credentials::hash_token(&token),
                expires_at,
            })
            .await?;

        info!(subsystem = "auth", user_id = creds.user.id, "Token issued");
        Ok(token)
    }

    /// Resolve a bearer token to its owner.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser> {
        self.users
            .find_token(&credentials::hash_token(token))
            .await?
            .ok_or_else(|| Error::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()))
    }

    /// Revoke the token the caller authenticated with.
    pub async fn logout(&self, auth: &AuthUser) -> Result<()> {
        self.users.revoke_token(auth.token_id).await?;
        info!(subsystem = "auth", user_id = auth.user.id, "Token revoked");
        Ok(())
    }

    /// Create or update a user account with a freshly hashed password.
    pub async fn register_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || credentials::hash_password(&password))
            .await
            .map_err(|e| Error::Internal(format!("password hashing task: {}", e)))??;

        self.users
            .upsert_user(CreateUserRequest {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
    }
}

/// Expiry for a token issued at `now`; `None` when tokens never expire.
fn token_expiry(
    now: DateTime<Utc>,
    ttl: Option<chrono::Duration>,
) -> Result<Option<DateTime<Utc>>> {
    ttl.map(|ttl| {
        now.checked_add_signed(ttl)
            .ok_or_else(|| Error::Config(format!("token lifetime {} is out of range", ttl)))
    })
    .transpose()
}
