//! Translation HTTP handlers.
//!
//! Query parameters are taken as raw strings so that malformed values
//! degrade gracefully: a bad `page` falls back to the first page and a
//! non-numeric `tag`/`locale` matches nothing.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use glossa_core::{ExportPayload, Page, PageRequest, TranslationFilter, TranslationFull};

use crate::error::ApiError;
use crate::services::TranslationPayload;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub key: Option<String>,
    pub content: Option<String>,
    pub tag: Option<String>,
    pub locale: Option<String>,
    pub page: Option<String>,
}

/// Blank strings count as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn page_request(raw: Option<&str>) -> PageRequest {
    PageRequest::new(raw.and_then(|p| p.trim().parse().ok()))
}

/// Parsed id predicate: absent, a usable id, or a value that can match nothing.
enum IdParam {
    Absent,
    Id(i64),
    Unmatchable,
}

fn id_param(raw: Option<String>) -> IdParam {
    match non_blank(raw) {
        None => IdParam::Absent,
        Some(v) => v.trim().parse().map_or(IdParam::Unmatchable, IdParam::Id),
    }
}

impl SearchQuery {
    /// Convert to a filter, or `None` when a predicate cannot match any row.
    fn into_filter(self) -> Option<TranslationFilter> {
        let tag_id = match id_param(self.tag) {
            IdParam::Absent => None,
            IdParam::Id(id) => Some(id),
            IdParam::Unmatchable => return None,
        };
        let locale_id = match id_param(self.locale) {
            IdParam::Absent => None,
            IdParam::Id(id) => Some(id),
            IdParam::Unmatchable => return None,
        };
        Some(TranslationFilter {
            key: non_blank(self.key),
            content: non_blank(self.content),
            tag_id,
            locale_id,
        })
    }
}

/// List all translations, 20 per page.
pub async fn list_translations(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Page<TranslationFull>>, ApiError> {
    let Query(query) = query?;
    let page = state
        .translations
        .list(page_request(query.page.as_deref()))
        .await?;
    Ok(Json(page))
}

/// Search translations.
///
/// # Query Parameters
/// - `key`: substring of the key (case-sensitive)
/// - `content`: substring of the value (case-sensitive)
/// - `tag`: tag id the translation must carry
/// - `locale`: locale id the translation must belong to
/// - `page`: 1-based page number
pub async fn search_translations(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Page<TranslationFull>>, ApiError> {
    let Query(mut query) = query?;
    let page = page_request(query.page.take().as_deref());

    let Some(filter) = query.into_filter() else {
        return Ok(Json(Page::empty(page)));
    };
    Ok(Json(state.translations.search(&filter, page).await?))
}

/// # Returns
/// - 201 Created with the translation, its locale and tags
/// - 409 Conflict if the key already exists for the locale
/// - 422 Unprocessable Entity on invalid fields or unknown locale/tags
pub async fn create_translation(
    State(state): State<AppState>,
    body: Result<Json<TranslationPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<TranslationFull>), ApiError> {
    let Json(payload) = body?;
    let created = state.translations.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_translation(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<TranslationFull>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.translations.get(id).await?))
}

/// Partial update. `tags` absent or null leaves tags untouched; `[]` detaches all.
pub async fn update_translation(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TranslationPayload>, JsonRejection>,
) -> Result<Json<TranslationFull>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = body?;
    Ok(Json(state.translations.update(id, payload).await?))
}

pub async fn delete_translation(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.translations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every translation of a locale as a flat `key → value` object.
pub async fn export_translations(
    State(state): State<AppState>,
    code: Result<Path<String>, PathRejection>,
) -> Result<Json<ExportPayload>, ApiError> {
    let Path(code) = code?;
    Ok(Json(state.translations.export(&code).await?))
}
