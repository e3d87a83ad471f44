//! Error types for the admin session layer and the HTTP handlers.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Failure kinds of the admin session mechanism.
///
/// `Unauthenticated` and `Forbidden` are per-request outcomes. `Config`
/// means the server cannot sign or verify sessions at all and must abort
/// the operation instead of falling back to an unsigned session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminAuthError {
    #[error("UNAUTHENTICATED")]
    Unauthenticated,

    #[error("FORBIDDEN")]
    Forbidden,

    #[error("configuration error: {0}")]
    Config(String),
}

impl AdminAuthError {
    /// Wire code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AdminAuthError::Unauthenticated => "UNAUTHENTICATED",
            AdminAuthError::Forbidden => "FORBIDDEN",
            AdminAuthError::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AdminAuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AdminAuthError::Forbidden => StatusCode::FORBIDDEN,
            AdminAuthError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        if let AdminAuthError::Config(msg) = &self {
            error!("Admin session misconfigured: {}", msg);
        }
        let body = json!({ "success": false, "error": self.code() });
        (self.status(), Json(body)).into_response()
    }
}

/// Error returned by JSON API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AdminAuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Body extraction failures (bad JSON, wrong content type, wrong field
/// types) answer with the same JSON shape as every other API error.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => e.into_response(),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": msg })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AdminAuthError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AdminAuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AdminAuthError::Config("missing secret".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(AdminAuthError::Unauthenticated.code(), "UNAUTHENTICATED");
        assert_eq!(AdminAuthError::Forbidden.code(), "FORBIDDEN");
        assert_eq!(AdminAuthError::Config(String::new()).code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_json_rejection_is_bad_request() {
        use axum::extract::FromRequest;

        let request = axum::http::Request::builder()
            .method("POST")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let rejection = Json::<serde_json::Value>::from_request(request, &())
            .await
            .unwrap_err();
        let err = ApiError::from(rejection);
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.contains("Content-Type")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_bad_request_response() {
        let resp = ApiError::BadRequest("Missing idToken".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
