//! Application error types and their HTTP mapping.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    /// Jira answered with a non-success status; the status is mirrored to the client.
    #[error("Upstream responded {status}: {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: Vec<String>,
    },

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), Vec::new()),
            AppError::Auth(msg) | AppError::Jwt(msg) => {
                (StatusCode::UNAUTHORIZED, msg.clone(), Vec::new())
            }
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), Vec::new()),
            AppError::Upstream {
                status,
                message,
                details,
            } => (*status, message.clone(), details.clone()),
            AppError::Mail(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send verification code".to_string(),
                Vec::new(),
            ),
            AppError::Http(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream request failed".to_string(),
                Vec::new(),
            ),
            AppError::Config(_) | AppError::Db(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Vec::new(),
            ),
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else if matches!(self, AppError::Upstream { .. }) {
            warn!(error = %self, "upstream rejected request");
        } else {
            debug!(error = %self, "request rejected");
        }

        let mut body = json!({ "error": message });
        if !details.is_empty() {
            body["details"] = json!(details);
        }
        (status, Json(body)).into_response()
    }
}

/// Malformed or mistyped JSON bodies are client errors, reported in the usual error shape.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

pub type AppResult<T> = Result<T, AppError>;
