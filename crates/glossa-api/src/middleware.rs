//! Request middleware: correlation ids, rate limiting and bearer auth.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::auth::UNAUTHENTICATED_MESSAGE;
use crate::state::AppState;

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically in logs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            warn!(subsystem = "api", "Rate limit exceeded");
            return ApiError::TooManyRequests.into_response();
        }
    }
    next.run(request).await
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(request: &Request) -> Option<&str> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Reject requests without a valid bearer token before any handler runs.
///
/// On success the resolved [`glossa_core::AuthUser`] is inserted as a request
/// extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&request).map(str::to_owned) else {
        return ApiError::Unauthorized(UNAUTHENTICATED_MESSAGE.to_string()).into_response();
    };

    match state.auth.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(auth: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/user");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&request_with(Some("Bearer gl_abc"))), Some("gl_abc"));
        assert_eq!(bearer_token(&request_with(Some("bearer  gl_abc "))), Some("gl_abc"));
        assert_eq!(bearer_token(&request_with(Some("Basic dXNlcg=="))), None);
        assert_eq!(bearer_token(&request_with(Some("Bearer "))), None);
        assert_eq!(bearer_token(&request_with(None)), None);
    }

    #[test]
    fn test_request_ids_are_uuid_v7() {
        let mut maker = MakeRequestUuidV7;
        let id = maker.make_request_id(&request_with(None)).unwrap();
        let parsed = Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }
}
