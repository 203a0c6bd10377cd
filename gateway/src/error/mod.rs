use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Failures of a single command or callback. None of these are fatal to the
/// process; each one terminates only the current workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BotError {
    #[error("backend rejected the credential")]
    Authentication,
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("no active session")]
    SessionExpired,
    #[error("backend rate limit hit")]
    RateLimited { retry_after: Option<Duration> },
    #[error("backend unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("backend request timed out")]
    Timeout,
    #[error("confirmation is no longer available")]
    ConfirmationUnavailable,
}

impl BotError {
    pub fn validation(message: impl Into<String>) -> Self {
        BotError::Validation(vec![message.into()])
    }

    pub fn code(&self) -> &'static str {
        match self {
            BotError::Authentication => "AUTHENTICATION_ERROR",
            BotError::Validation(_) => "VALIDATION_ERROR",
            BotError::SessionExpired => "SESSION_EXPIRED",
            BotError::RateLimited { .. } => "RATE_LIMITED",
            BotError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            BotError::Network(_) => "NETWORK_ERROR",
            BotError::Timeout => "TIMEOUT",
            BotError::ConfirmationUnavailable => "CONFIRMATION_UNAVAILABLE",
        }
    }

    /// Text shown to the chat user. Backend bodies never reach this point
    /// except for validation messages, which are user-facing.
    pub fn user_message(&self) -> String {
        match self {
            BotError::Authentication => {
                "Your API key was rejected. Please re-authenticate with `/auth <api-key>`."
                    .to_string()
            }
            BotError::Validation(errors) if errors.is_empty() => "Invalid request.".to_string(),
            BotError::Validation(errors) => {
                let lines: Vec<String> = errors.iter().map(|e| format!("• {}", e)).collect();
                format!("Invalid request:\n{}", lines.join("\n"))
            }
            BotError::SessionExpired => {
                "Your session has expired or you are not logged in. Please authenticate again with `/auth <api-key>`."
                    .to_string()
            }
            BotError::RateLimited {
                retry_after: Some(wait),
            } => format!(
                "Too many requests. Please try again in {} seconds.",
                wait.as_secs().max(1)
            ),
            BotError::RateLimited { retry_after: None } => {
                "Too many requests. Please try again later.".to_string()
            }
            BotError::ServiceUnavailable(_) | BotError::Network(_) | BotError::Timeout => {
                "The wallet service is temporarily unavailable. Please try again shortly."
                    .to_string()
            }
            BotError::ConfirmationUnavailable => {
                "This transfer confirmation has already been used or has expired. Please run `/send-money` again."
                    .to_string()
            }
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    BadRequest(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: code.to_string(),
            details: None,
        });

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("Malformed payload: {}", err))
    }
}
