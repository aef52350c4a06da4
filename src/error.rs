//! Domain error types for Takagi.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.
//! Client-facing errors serialize as `{"detail": ...}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or contradictory request parameters.
    #[error("{0}")]
    InvalidRequest(String),

    /// The state envelope failed to verify or does not match the request.
    #[error("mismatching_state: CSRF Warning! State not equal in request and response.")]
    MismatchingState,

    /// Access token failed to verify or decrypt. Responds 401 with no body.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// GitHub returned a non-2xx response. Re-raised to the client verbatim.
    #[error("GitHub returned {status}")]
    Upstream {
        status: StatusCode,
        body: serde_json::Value,
    },

    /// Internal failure. Details are logged, never sent to the client.
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::InvalidRequest(_) | AppError::MismatchingState => {
                HttpResponse::BadRequest().json(ErrorDetail {
                    detail: serde_json::Value::String(self.to_string()),
                })
            }
            AppError::Unauthorized => HttpResponse::Unauthorized().finish(),
            AppError::NotFound(_) => HttpResponse::NotFound().json(ErrorDetail {
                detail: serde_json::Value::String(self.to_string()),
            }),
            AppError::Upstream { status, body } => HttpResponse::build(*status).json(ErrorDetail {
                detail: body.clone(),
            }),
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                HttpResponse::InternalServerError().json(ErrorDetail {
                    detail: serde_json::Value::String("internal server error".to_string()),
                })
            }
        }
    }
}

/// Error response body. `detail` is a string for local errors and GitHub's
/// JSON payload for upstream errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub detail: serde_json::Value,
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON serialization error: {}", err))
    }
}
