use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Application error taxonomy. Every handler returns `Result<_, ApiError>`;
/// the `IntoResponse` impl maps each variant to its HTTP status and a
/// `{"message": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("User with this email already exists")]
    DuplicateEmail,

    /// Deliberately identical for unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(String),

    /// Download, file-type or file-size failure while obtaining image bytes.
    #[error("{0}")]
    Acquisition(String),

    #[error("Unsupported or corrupt image data")]
    UnsupportedImage,

    #[error("Server error")]
    Database(#[from] sqlx::Error),

    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::DuplicateEmail
            | ApiError::InvalidCredentials
            | ApiError::Acquisition(_)
            | ApiError::UnsupportedImage => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                ApiError::Database(e) => error!(error = %e, "database error"),
                ApiError::Internal(e) => error!(error = %e, "internal error"),
                _ => {}
            }
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
