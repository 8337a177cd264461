//! Login, logout and current-user handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use serde_json::{json, Value};

use glossa_core::{AuthUser, User};

use crate::error::ApiError;
use crate::services::LoginPayload;
use crate::state::AppState;

/// Exchange credentials for a bearer token.
///
/// # Returns
/// - 200 OK with `{ "token": "...", "message": "..." }`
/// - 422 Unprocessable Entity on missing fields or bad credentials
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body?;
    let token = state.auth.login(payload).await?;
    Ok(Json(json!({
        "token": token,
        "message": "Logged in successfully!",
    })))
}

/// Revoke the token used for this request.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    state.auth.logout(&auth).await?;
    Ok(Json(json!({ "message": "Logged out successfully!" })))
}

pub async fn current_user(Extension(auth): Extension<AuthUser>) -> Json<User> {
    Json(auth.user)
}
