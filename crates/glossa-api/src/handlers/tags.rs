//! Tag CRUD handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use glossa_core::Tag;

use crate::error::ApiError;
use crate::services::TagPayload;
use crate::state::AppState;

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tags.list().await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    body: Result<Json<TagPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let Json(payload) = body?;
    let tag = state.tags.create(payload).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn get_tag(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Tag>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.tags.get(id).await?))
}

pub async fn update_tag(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TagPayload>, JsonRejection>,
) -> Result<Json<Tag>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = body?;
    Ok(Json(state.tags.update(id, payload).await?))
}

/// Delete a tag. Translations carrying it are kept, minus the tag.
pub async fn delete_tag(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.tags.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
