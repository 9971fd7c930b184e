use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::converter::ConversionError;
use crate::gemini::ModelError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A required form field was left empty. Nothing was sent to the model.
    #[error("Missing input '{field}': {message}")]
    MissingInput {
        field: &'static str,
        message: &'static str,
    },

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("LLM error: {0}")]
    Llm(#[from] ModelError),

    /// The upload body exceeded the configured ceiling.
    #[error("Upload exceeds the {limit_bytes} byte limit")]
    PayloadTooLarge { limit_bytes: usize },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::MissingInput { field, message } => {
                let body = Json(json!({
                    "error": {
                        "code": "MISSING_INPUT",
                        "field": field,
                        "message": message
                    }
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Conversion(e) => {
                tracing::error!("Conversion error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONVERSION_ERROR",
                    format!("The uploaded resume could not be converted: {e}"),
                )
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::PayloadTooLarge { limit_bytes } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!(
                    "The file is too large; uploads are limited to {} MB",
                    limit_bytes / (1024 * 1024)
                ),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
