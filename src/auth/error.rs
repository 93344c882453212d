use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Failures reported by an [`AccountRepository`](super::repo::AccountRepository).
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("account not found")]
    NotFound,

    /// The store rejected the insert on its unique email constraint.
    #[error("account with this email already stored")]
    Duplicate,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("account already exists")]
    Conflict,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing error: {0}")]
    Hashing(String),

    #[error("token signing error: {0}")]
    Signing(String),

    #[error("store error: {0}")]
    Store(#[from] RepoError),

    #[error("operation cancelled: deadline elapsed")]
    Cancelled,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Hashing(_) | AuthError::Signing(_) | AuthError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AuthError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message safe to return to a client.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Conflict => "User already exists".into(),
            AuthError::InvalidCredentials => "Invalid credentials".into(),
            AuthError::Hashing(_) | AuthError::Signing(_) | AuthError::Store(_) => {
                "Internal server error".into()
            }
            AuthError::Cancelled => "Request timed out".into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}
