// Error handling module for the field-sales order engine
// Provides the shared error taxonomy and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error};
use utoipa::ToSchema;

/// Result type alias used by every store, engine and service in the crate
pub type ApiResult<T> = Result<T, ApiError>;

/// Main error type for the engine
///
/// Collaborator errors propagate through unchanged; the engine only attaches
/// operation context (which line item, which reference) to the message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed input: missing line items, non-positive quantity,
    /// missing accept-order fields.
    /// Maps to HTTP 400 Bad Request
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Referenced product, pharmacy or order does not exist
    /// Maps to HTTP 404 Not Found
    #[error("{resource} with id {id} not found")]
    NotFound { resource: String, id: String },

    /// Underlying store unreachable or a write failed
    /// Maps to HTTP 500 Internal Server Error, details are not sent to clients
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let (error_code, message) = match self {
            ApiError::ValidationError(message) => {
                debug!("Validation error: {}", message);
                ("VALIDATION_ERROR", message.clone())
            }
            ApiError::NotFound { .. } => {
                debug!("{}", self);
                ("NOT_FOUND", self.to_string())
            }
            ApiError::PersistenceError(details) => {
                // Full details stay in the logs
                error!("Persistence error: {}", details);
                ("PERSISTENCE_ERROR", "A persistence error occurred".to_string())
            }
        };

        (
            self.status_code(),
            ErrorResponse {
                error_code: error_code.to_string(),
                message,
                timestamp: Utc::now().to_rfc3339(),
            },
        )
    }
}

/// Consistent error response structure
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,
    /// Human-readable error message
    pub message: String,
    /// ISO 8601 timestamp of when the error occurred
    pub timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::PersistenceError(error.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors.to_string())
    }
}
