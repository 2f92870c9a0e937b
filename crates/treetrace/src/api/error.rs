//! Mapping of [`Error`] onto HTTP responses.
//!
//! Every failure is reported as `{"error": {"code": ..., "message": ...}}`.
//! Server-side failures are logged and reported without internal detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::Error;

/// Error payload sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::CycleDetected { .. } | Self::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code reported to clients.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } | Self::Json(_) => "validation_failed",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            _ => "internal_error",
        }
    }

    /// The body sent to the client.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let message = if self.status().is_server_error() {
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        ErrorBody {
            code: self.code(),
            message,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }
        (status, Json(ErrorEnvelope { error: self.body() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::not_found("family member", "m").status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            Error::CycleDetected {
                member: "a".to_string(),
                parent: "b".to_string()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::internal("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_hidden() {
        let body = Error::internal("database path /secret").body();
        assert_eq!(body.code, "internal_error");
        assert!(!body.message.contains("secret"));
    }

    #[test]
    fn test_client_error_message_surfaces() {
        let body = Error::validation("name must not be blank").body();
        assert_eq!(body.code, "validation_failed");
        assert_eq!(body.message, "validation failed: name must not be blank");
    }

    #[test]
    fn test_response_status() {
        let response = Error::not_found("health condition", "c1").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
