//! Error types for Fleet API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fleet API error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(Uuid),

    #[error("Driver not found: {0}")]
    DriverNotFound(Uuid),

    #[error("Inspection not found: {0}")]
    InspectionNotFound(Uuid),

    #[error("Vehicle with license plate {0} already exists")]
    DuplicateLicensePlate(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Authentication is required to access this resource")]
    Unauthorized,

    #[error("You do not have permission to access this resource")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Standardized error body shared by all error responses, including the
/// rate limiter's 429 rejection.
pub fn error_body(status: StatusCode, error: &str, message: &str) -> serde_json::Value {
    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "status": status.as_u16(),
        "error": error,
        "message": message,
    })
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Error::VehicleNotFound(_) | Error::DriverNotFound(_) | Error::InspectionNotFound(_) => {
                tracing::debug!("Resource not found: {}", self);
                (StatusCode::NOT_FOUND, "Not Found", self.to_string())
            }
            Error::DuplicateLicensePlate(_) => {
                tracing::warn!("License plate conflict: {}", self);
                (StatusCode::CONFLICT, "Conflict", self.to_string())
            }
            Error::Validation(_) => {
                tracing::debug!("Validation failed: {}", self);
                (StatusCode::BAD_REQUEST, "Bad Request", self.to_string())
            }
            Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", self.to_string()),
            Error::Forbidden => (StatusCode::FORBIDDEN, "Forbidden", self.to_string()),
            Error::Internal(_) => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "An unexpected error occurred. Please try again later.".to_string(),
                )
            }
        };

        let body = Json(error_body(status, error, &message));
        (status, body).into_response()
    }
}
