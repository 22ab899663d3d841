use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum AppError {
    /// A required credential or endpoint is missing for a remote call.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A remote service answered with a failure status or an unexpected shape.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Model output could not be interpreted even after brace extraction.
    #[error("Model output not interpretable: {0}")]
    ParseRecoveryFailure(String),

    /// A network call ran past its timeout budget.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    /// A local asset could not be written.
    #[error("Storage error: {0}")]
    StorageError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::ConfigurationError(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                (StatusCode::PRECONDITION_FAILED, msg.clone())
            }
            AppError::ProviderError(msg) => {
                tracing::error!(error = %msg, "Upstream provider error");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::ParseRecoveryFailure(msg) => {
                tracing::error!(error = %msg, "Unrecoverable model output");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::DeadlineExceeded(msg) => {
                tracing::warn!(error = %msg, "Deadline exceeded");
                (StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            AppError::ValidationError(msg) => {
                tracing::warn!(error = %msg, "Validation error");
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::StorageError(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::DeadlineExceeded(err.to_string())
        } else {
            AppError::ProviderError(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
