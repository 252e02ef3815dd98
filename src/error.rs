//! Structured error types for API responses.

use crate::db::StoreError;
use crate::types::TitleError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidBody,

    // Not found errors
    TaskNotFound,

    // Internal errors
    DatabaseError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidBody => StatusCode::BAD_REQUEST,
            ErrorCode::TaskNotFound => StatusCode::NOT_FOUND,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error for API responses.
///
/// Serialized to clients as `{"error": message}`; the code picks the status.
#[derive(Debug)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub field: Option<String>,
}

/// Body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn invalid_title(err: TitleError) -> Self {
        let code = match err {
            TitleError::Blank => ErrorCode::MissingRequiredField,
            TitleError::TooLong => ErrorCode::InvalidFieldValue,
        };
        Self::new(code, err.to_string()).with_field("title")
    }

    pub fn invalid_completed() -> Self {
        Self::new(
            ErrorCode::InvalidFieldValue,
            "Completed must be a boolean value",
        )
        .with_field("completed")
    }

    pub fn invalid_id(raw: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFieldValue,
            format!("Invalid task id: {}", raw),
        )
        .with_field("id")
    }

    pub fn invalid_body(reason: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InvalidBody, format!("Invalid request body: {}", reason))
    }

    pub fn task_not_found() -> Self {
        Self::new(ErrorCode::TaskNotFound, "Task not found")
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::database(err)
    }
}

impl From<TitleError> for ApiError {
    fn from(err: TitleError) -> Self {
        ApiError::invalid_title(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.code, "Request failed: {}", self.message);
        } else {
            tracing::debug!(code = ?self.code, field = ?self.field, "Request rejected: {}", self.message);
        }
        (
            status,
            Json(ErrorBody {
                error: &self.message,
            }),
        )
            .into_response()
    }
}

/// Result type for request handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_statuses() {
        assert_eq!(ApiError::invalid_completed().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::invalid_id("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::task_not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::Poisoned).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn title_errors_keep_their_message() {
        let err = ApiError::from(TitleError::Blank);
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert_eq!(err.message, "Task title is required");
        assert_eq!(err.field.as_deref(), Some("title"));
    }

    #[test]
    fn body_has_only_error_field() {
        let body = serde_json::to_value(ErrorBody { error: "Task not found" }).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "Task not found" }));
    }
}
