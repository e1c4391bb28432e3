use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use sitevault_core::error::CoreError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `sitevault_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const SANITIZED_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::ImmutabilityViolation { .. } => (
                    StatusCode::METHOD_NOT_ALLOWED,
                    "IMMUTABLE",
                    core.to_string(),
                ),
                CoreError::ChecksumMismatch { .. } => (
                    StatusCode::CONFLICT,
                    "CHECKSUM_MISMATCH",
                    core.to_string(),
                ),
                CoreError::OrganisationAccess => (
                    StatusCode::FORBIDDEN,
                    "ACCESS_DENIED",
                    "Access denied".to_string(),
                ),
                CoreError::VersionConflict { .. } => {
                    tracing::warn!(error = %core, "Version allocation gave up");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "VERSION_CONFLICT",
                        "Too many concurrent snapshots for this entity, retry later".to_string(),
                    )
                }
                CoreError::UnsupportedFormat(_) => (
                    StatusCode::BAD_REQUEST,
                    "UNSUPPORTED_FORMAT",
                    core.to_string(),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Storage(msg) => {
                    tracing::error!(error = %msg, "Snapshot store error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        SANITIZED_MESSAGE.to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
