//! Error types for Authgate
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Whether 500 responses carry the underlying error detail.
///
/// Set once at startup from `server.environment`; production gets a
/// generic message.
static DETAILED_ERRORS: AtomicBool = AtomicBool::new(false);

pub fn set_detailed_errors(enabled: bool) {
    DETAILED_ERRORS.store(enabled, Ordering::Relaxed);
}

fn detailed_errors() -> bool {
    DETAILED_ERRORS.load(Ordering::Relaxed)
}

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// OAuth code exchange or profile fetch failed (401)
    ///
    /// The login callback converts this into a failure redirect instead
    /// of a JSON response; no session is ever issued.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Authentication required (401)
    #[error("Please log in to access this resource")]
    Unauthorized,

    /// Caller already holds a valid session (400)
    #[error("You are already logged in")]
    AlreadyAuthenticated,

    /// Login attempt limit exceeded (429)
    #[error("Too many login attempts. Please try again later.")]
    TooManyAttempts,

    /// Validation error (400)
    #[error("{0}")]
    Validation(String),

    /// Resource not found (404)
    ///
    /// A valid session pointing at a missing user record is a consistency
    /// fault, not a 404; handlers map that case to `Internal`.
    #[error("Resource not found")]
    NotFound,

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to its HTTP status code and the uniform
    /// `{error, message}` JSON envelope.
    fn into_response(self) -> Response {
        use axum::Json;

        let generic = || "Something went wrong".to_string();
        let (status, error, message, error_type) = match &self {
            AppError::AuthenticationFailed(_) => (
                StatusCode::UNAUTHORIZED,
                "Authentication Failed",
                self.to_string(),
                "authentication_failed",
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                self.to_string(),
                "unauthorized",
            ),
            AppError::AlreadyAuthenticated => (
                StatusCode::BAD_REQUEST,
                "Already Authenticated",
                self.to_string(),
                "already_authenticated",
            ),
            AppError::TooManyAttempts => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too Many Requests",
                self.to_string(),
                "rate_limited",
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "Bad Request", msg.clone(), "validation")
            }
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "Not Found",
                self.to_string(),
                "not_found",
            ),
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                if detailed_errors() { self.to_string() } else { generic() },
                "config",
            ),
            AppError::HttpClient(_) => (
                StatusCode::BAD_GATEWAY,
                "Bad Gateway",
                if detailed_errors() { self.to_string() } else { generic() },
                "http_client",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                if detailed_errors() { self.to_string() } else { generic() },
                "internal",
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        let cases = [
            (
                AppError::AuthenticationFailed("bad code".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::AlreadyAuthenticated, StatusCode::BAD_REQUEST),
            (AppError::TooManyAttempts, StatusCode::TOO_MANY_REQUESTS),
            (
                AppError::Validation("Name is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
