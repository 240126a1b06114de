//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use parley_types::error::{CharacterError, SpeechError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Speech(SpeechError),
    Character(CharacterError),
    /// Generic internal error.
    Internal(String),
}

impl From<SpeechError> for AppError {
    fn from(e: SpeechError) -> Self {
        AppError::Speech(e)
    }
}

impl From<CharacterError> for AppError {
    fn from(e: CharacterError) -> Self {
        AppError::Character(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Speech(SpeechError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "SPEECH_NOT_FOUND",
                format!("Speech '{id}' not found"),
            ),
            AppError::Speech(e @ SpeechError::Disabled(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SPEECH_DISABLED", e.to_string())
            }
            AppError::Speech(e @ SpeechError::Backend(_)) => {
                (StatusCode::BAD_GATEWAY, "SPEECH_BACKEND_ERROR", e.to_string())
            }
            AppError::Speech(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SPEECH_ERROR", e.to_string())
            }
            AppError::Character(CharacterError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "CHARACTER_NOT_FOUND",
                format!("Character '{id}' not found"),
            ),
            AppError::Character(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CHARACTER_ERROR", e.to_string())
            }
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::warn!(code, %message, "request failed");
        }

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
