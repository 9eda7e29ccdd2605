//! Caller identity for HTTP routes
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! player in the `X-User-Id` header and the engine trusts it.
//!
//! ```rust,ignore
//! async fn handler(Caller(player): Caller) -> String {
//!     format!("Hello, {player}")
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use realmhub_domain::PlayerName;

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "X-User-Id";

/// Extractor for the calling player.
///
/// Rejects with 401 when the header is missing and 400 when it is not a
/// valid player name.
#[derive(Debug, Clone)]
pub struct Caller(pub PlayerName);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;

        PlayerName::new(raw)
            .map(Caller)
            .map_err(|e| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn whoami(Caller(player): Caller) -> String {
        format!("player:{player}")
    }

    fn app() -> Router {
        Router::new().route("/", get(whoami))
    }

    #[tokio::test]
    async fn header_becomes_caller() {
        let request = Request::builder()
            .uri("/")
            .header(USER_ID_HEADER, "alice@example.com")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"player:alice@example.com");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_identity_is_bad_request() {
        let request = Request::builder()
            .uri("/")
            .header(USER_ID_HEADER, "not a name!")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
