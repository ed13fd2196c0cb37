//! Application error type mapping to HTTP status codes and envelope format.

use std::time::Instant;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use mockloop_types::error::InterviewError;
use mockloop_types::llm::LlmError;

use super::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Interview(InterviewError),
    /// Malformed request detected before reaching the engine.
    Validation(String),
}

impl From<InterviewError> for AppError {
    fn from(e: InterviewError) -> Self {
        AppError::Interview(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) | AppError::Interview(InterviewError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            AppError::Interview(InterviewError::Backend(LlmError::UnknownProvider(_))) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_PROVIDER")
            }
            AppError::Interview(InterviewError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            AppError::Interview(InterviewError::InvalidState(_)) => {
                (StatusCode::CONFLICT, "INVALID_STATE")
            }
            AppError::Interview(InterviewError::Backend(LlmError::Timeout(_))) => {
                (StatusCode::BAD_GATEWAY, "BACKEND_TIMEOUT")
            }
            AppError::Interview(InterviewError::Backend(_)) => {
                (StatusCode::BAD_GATEWAY, "BACKEND_ERROR")
            }
            AppError::Interview(InterviewError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            // Store details stay in the server log.
            AppError::Interview(InterviewError::Storage(_)) => "internal storage failure".to_string(),
            AppError::Interview(e) => e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = ?self, "request failed");
        }
        let body = ApiResponse::error(code, &self.message(), Instant::now());
        (status, Json(body)).into_response()
    }
}
