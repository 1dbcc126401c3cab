use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rowguard_session::SessionError;
use serde_json::json;

/// The only body an unauthenticated caller ever sees.
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("query failed: {0}")]
    Query(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Session(SessionError::InvalidPrincipal(_))
            | ApiError::Session(SessionError::ContextBinding(_)) => {
                tracing::warn!(error = %self, "Rejecting request at binding");
                unauthorized()
            }
            ApiError::Session(SessionError::Acquire(_)) => {
                tracing::error!(error = %self, "No database connection available");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "unavailable" })),
                )
                    .into_response()
            }
            ApiError::Session(SessionError::Timeout(_)) => {
                tracing::warn!(error = %self, "Request timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    Json(json!({ "error": "timeout" })),
                )
                    .into_response()
            }
            _ => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal" })),
                )
                    .into_response()
            }
        }
    }
}
