use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use thiserror::Error;

use crate::auth::AuthError;
use crate::document::ValidationError;
use crate::store::StoreError;

/// HTTP server lifecycle errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server terminated unexpectedly")]
    Serve {
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// JSON error body: `{ "error": ..., "details"?: ... }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    pub fn invalid_data(errors: &[ValidationError]) -> Self {
        let details = errors
            .iter()
            .map(|e| json!({ "field": e.field(), "message": e.to_string() }))
            .collect();
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Invalid data".to_string(),
            details: Some(Value::Array(details)),
        }
    }

    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: "Invalid data".to_string(),
            details: Some(json!([{ "message": message.into() }])),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Document not found")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store failure");
        Self::internal()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::invalid_data(&errors),
            AuthError::EmailTaken => Self::new(StatusCode::BAD_REQUEST, "User already exists"),
            AuthError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            AuthError::MissingToken => Self::new(StatusCode::UNAUTHORIZED, "Missing token"),
            AuthError::InvalidToken => Self::new(StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::UserNotFound => Self::new(StatusCode::UNAUTHORIZED, "User not found"),
            AuthError::Hash(message) => {
                tracing::error!(%message, "password hashing failed");
                Self::internal()
            }
            AuthError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}
