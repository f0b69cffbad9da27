use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::{RevocationError, TokenError};

/// Application-level errors for HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(#[source] anyhow::Error),

    #[error("Internal error: {0}")]
    InternalError(#[source] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log the detailed error with full context chain
        tracing::error!("Handler error: {:?}", self);

        let body = match &self {
            AppError::BadRequest(err) => json!({
                "error": "bad_request",
                "message": err.to_string(),
            }),
            AppError::InternalError(_) => json!({
                "error": "internal_error",
                "message": "Internal server error.",
            }),
        };

        (status, Json(body)).into_response()
    }
}

// Implement From for common error types to allow automatic conversion
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<RevocationError> for AppError {
    fn from(err: RevocationError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) => AppError::BadRequest(anyhow::Error::new(err)),
            TokenError::Signing(_) | TokenError::Revocation(_) => {
                AppError::InternalError(anyhow::Error::new(err))
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError(err)
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
