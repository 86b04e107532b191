// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 422 Unprocessable Entity (e.g., an item without correct answers)
    Unprocessable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Responds with `{"error": <human message>, "reason": <raw reason>}`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, reason) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    String::new(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Invalid request.", msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized.", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Object does not exist.", msg),
            AppError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Error processing request.",
                msg,
            ),
        };
        let body = Json(json!({
            "error": error_message,
            "reason": reason,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Errors raised by the grading and feedback pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackError {
    /// Malformed input or out-of-range settings.
    Validation(String),

    /// A referenced questionnaire or settings entity is missing.
    NotFound(String),

    /// The item has no correct choices to grade against.
    Grading(String),

    /// Any failure while building, requesting or storing feedback.
    FeedbackGeneration { stage: &'static str, reason: String },

    /// Nothing to aggregate.
    Aggregation(String),
}

impl FeedbackError {
    pub fn generation(stage: &'static str, reason: impl fmt::Display) -> Self {
        FeedbackError::FeedbackGeneration {
            stage,
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for FeedbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackError::Validation(msg) => write!(f, "validation error: {}", msg),
            FeedbackError::NotFound(msg) => write!(f, "not found: {}", msg),
            FeedbackError::Grading(msg) => write!(f, "grading error: {}", msg),
            FeedbackError::FeedbackGeneration { stage, reason } => {
                write!(f, "feedback generation failed at {}: {}", stage, reason)
            }
            FeedbackError::Aggregation(msg) => write!(f, "aggregation error: {}", msg),
        }
    }
}

impl std::error::Error for FeedbackError {}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::Validation(msg) => AppError::BadRequest(msg),
            FeedbackError::NotFound(msg) => AppError::NotFound(msg),
            FeedbackError::Grading(_) | FeedbackError::Aggregation(_) => {
                AppError::Unprocessable(err.to_string())
            }
            FeedbackError::FeedbackGeneration { .. } => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<AppError> for FeedbackError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => FeedbackError::NotFound(msg),
            AppError::BadRequest(msg) => FeedbackError::Validation(msg),
            other => FeedbackError::generation("store", other),
        }
    }
}
