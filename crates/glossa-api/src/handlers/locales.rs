//! Locale CRUD handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use glossa_core::Locale;

use crate::error::ApiError;
use crate::services::LocalePayload;
use crate::state::AppState;

pub async fn list_locales(State(state): State<AppState>) -> Result<Json<Vec<Locale>>, ApiError> {
    Ok(Json(state.locales.list().await?))
}

/// # Returns
/// - 201 Created with the locale
/// - 422 Unprocessable Entity if `code` is taken or a field is invalid
pub async fn create_locale(
    State(state): State<AppState>,
    body: Result<Json<LocalePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Locale>), ApiError> {
    let Json(payload) = body?;
    let locale = state.locales.create(payload).await?;
    Ok((StatusCode::CREATED, Json(locale)))
}

pub async fn get_locale(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Locale>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.locales.get(id).await?))
}

/// Partial update; fields left out of the body are unchanged.
pub async fn update_locale(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<LocalePayload>, JsonRejection>,
) -> Result<Json<Locale>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = body?;
    Ok(Json(state.locales.update(id, payload).await?))
}

/// Delete a locale and all of its translations.
pub async fn delete_locale(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.locales.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
