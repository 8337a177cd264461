//! HTTP handlers for glossa-api.

pub mod auth;
pub mod locales;
pub mod tags;
pub mod translations;

use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiError;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// JSON 404 for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Route".to_string())
}
