use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Failure kinds the pipeline can distinguish, mapped to HTTP status codes.
///
/// Every variant carries only an owned detail string so the error can be
/// cloned into response extensions for the error boundary middleware to pick
/// up. Anything a handler raises that does not fit a specific variant belongs
/// in `Internal`, which the classification table maps to a generic 500.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid operation: {0}")]
    InvalidState(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Map this failure to its status code, wire-level type name, and the
    /// message that is safe to show a client.
    ///
    /// Most variants deliberately discard their detail string here: the full
    /// failure is logged server-side by the error boundary, while the client
    /// only ever sees the fixed message from this table. `InvalidParameter`
    /// and `InvalidState` are the exception - their messages are user-facing
    /// by construction.
    ///
    /// Classification is pure: calling it twice on the same error yields the
    /// same result.
    pub fn classify(&self) -> (StatusCode, &'static str, Cow<'_, str>) {
        match self {
            AppError::MissingParameter(_) => (
                StatusCode::BAD_REQUEST,
                "MissingParameter",
                Cow::Borrowed("Required parameter is missing"),
            ),
            AppError::InvalidParameter(msg) => (
                StatusCode::BAD_REQUEST,
                "InvalidParameter",
                Cow::Borrowed(msg.as_str()),
            ),
            AppError::InvalidState(msg) => (
                StatusCode::BAD_REQUEST,
                "InvalidState",
                Cow::Borrowed(msg.as_str()),
            ),
            AppError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                "UnauthorizedAccess",
                Cow::Borrowed("Unauthorized access"),
            ),
            AppError::Timeout(_) => (
                StatusCode::REQUEST_TIMEOUT,
                "OperationTimeout",
                Cow::Borrowed("Request timed out"),
            ),
            AppError::NotImplemented(_) => (
                StatusCode::NOT_IMPLEMENTED,
                "NotImplemented",
                Cow::Borrowed("Feature not implemented"),
            ),
            // Catch-all: internal detail never reaches the client
            AppError::Internal(_) | AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                Cow::Borrowed("An internal server error occurred"),
            ),
        }
    }
}

/// JSON error body shared by classified failures and rate-limit rejections.
///
/// Wire shape (camelCase):
///
/// ```json
/// { "error": { "message": "...", "type": "...", "timestamp": "...", "traceId": "..." } }
/// ```
///
/// The 429 rate-limit body uses the same shape with `traceId` omitted.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "traceId", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorBody {
    /// Build a body from a classified failure. `trace_id` is filled in by the
    /// error boundary, which is the only place that knows the correlation id.
    pub fn new(error_type: &str, message: &str, trace_id: Option<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.to_string(),
                error_type: error_type.to_string(),
                timestamp: Utc::now(),
                trace_id,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Render the classified response immediately so AppError is usable
        // without the full pipeline, and stash the error in the response
        // extensions so the error boundary can log it once and attach the
        // correlation id to the body.
        let (status, error_type, message) = self.classify();
        let body = ErrorBody::new(error_type, &message, None);

        let mut response = (status, axum::Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        let cases = [
            (
                AppError::MissingParameter("user_id".into()),
                StatusCode::BAD_REQUEST,
                "MissingParameter",
                "Required parameter is missing",
            ),
            (
                AppError::InvalidParameter("count must be positive".into()),
                StatusCode::BAD_REQUEST,
                "InvalidParameter",
                "count must be positive",
            ),
            (
                AppError::InvalidState("stream already closed".into()),
                StatusCode::BAD_REQUEST,
                "InvalidState",
                "stream already closed",
            ),
            (
                AppError::Unauthorized("bad token".into()),
                StatusCode::UNAUTHORIZED,
                "UnauthorizedAccess",
                "Unauthorized access",
            ),
            (
                AppError::Timeout("upstream".into()),
                StatusCode::REQUEST_TIMEOUT,
                "OperationTimeout",
                "Request timed out",
            ),
            (
                AppError::NotImplemented("bulk export".into()),
                StatusCode::NOT_IMPLEMENTED,
                "NotImplemented",
                "Feature not implemented",
            ),
            (
                AppError::Internal("db connection refused".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                "An internal server error occurred",
            ),
        ];

        for (err, status, error_type, message) in cases {
            let (s, t, m) = err.classify();
            assert_eq!(s, status, "{err}");
            assert_eq!(t, error_type);
            assert_eq!(m, message);
        }
    }

    #[test]
    fn test_classification_is_idempotent() {
        let err = AppError::Unauthorized("expired session".into());
        assert_eq!(err.classify(), err.classify());
    }

    #[test]
    fn test_internal_detail_not_exposed() {
        let err = AppError::Internal("password=hunter2 leaked in trace".into());
        let (_, _, message) = err.classify();
        assert!(!message.contains("hunter2"));
    }

    #[test]
    fn test_error_body_camel_case_keys() {
        let body = ErrorBody::new("InternalError", "boom", Some("abc-123".into()));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"]["message"], "boom");
        assert_eq!(json["error"]["type"], "InternalError");
        assert_eq!(json["error"]["traceId"], "abc-123");
        assert!(json["error"]["timestamp"].is_string());
    }

    #[test]
    fn test_error_body_omits_missing_trace_id() {
        let body = ErrorBody::new("RateLimitExceeded", "slow down", None);
        let json = serde_json::to_value(&body).unwrap();

        assert!(json["error"].get("traceId").is_none());
    }
}
