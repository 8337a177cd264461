//! Route table and middleware stack.

use std::time::Duration;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{auth, health_check, locales, not_found, tags, translations};
use crate::middleware::{rate_limit_middleware, require_auth, MakeRequestUuidV7};
use crate::state::AppState;

/// Maximum accepted request body.
pub const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/api/login", post(auth::login));

    let protected = Router::new()
        .route("/api/logout", post(auth::logout))
        .route("/api/user", get(auth::current_user))
        // Locales
        .route(
            "/api/locales",
            get(locales::list_locales).post(locales::create_locale),
        )
        .route(
            "/api/locales/:id",
            get(locales::get_locale)
                .put(locales::update_locale)
                .patch(locales::update_locale)
                .delete(locales::delete_locale),
        )
        // Tags
        .route("/api/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/api/tags/:id",
            get(tags::get_tag)
                .put(tags::update_tag)
                .patch(tags::update_tag)
                .delete(tags::delete_tag),
        )
        // Translations
        .route(
            "/api/translations",
            get(translations::list_translations).post(translations::create_translation),
        )
        .route(
            "/api/translations/search",
            get(translations::search_translations),
        )
        .route(
            "/api/translations/export/:code",
            get(translations::export_translations),
        )
        .route(
            "/api/translations/:id",
            get(translations::get_translation)
                .put(translations::update_translation)
                .patch(translations::update_translation)
                .delete(translations::delete_translation),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_found)
        // Middleware
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.allowed_origins.clone()))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .with_state(state)
}
