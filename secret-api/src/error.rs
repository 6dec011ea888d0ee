//! Maps `CoreError` to the HTTP status codes in spec §7.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use secret_core::CoreError;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

pub struct ApiErrorResponse(pub CoreError);

impl From<CoreError> for ApiErrorResponse {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CoreError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
            CoreError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            CoreError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            CoreError::Auth(_) => (StatusCode::UNAUTHORIZED, "authentication failed".to_string()),
            CoreError::Integrity(m) => (StatusCode::BAD_REQUEST, m.clone()),
            CoreError::Storage(m) => {
                tracing::info!(cause = %m, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(ApiError { error: message })).into_response()
    }
}
