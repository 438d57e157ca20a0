//! # API Error Types
//!
//! [`AppError`] implements `IntoResponse` and maps domain errors to HTTP
//! status codes with a JSON body:
//!
//! | Error                           | Status |
//! |---------------------------------|--------|
//! | unparseable body, malformed hex | 400    |
//! | missing / invalid context field | 422    |
//! | proof generation failure        | 500    |
//!
//! A proof that decodes but does not verify is not an error; handlers
//! return `{"verified": false}` with 200.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradeseal_binding::BindingError;
use tradeseal_zkp::{ProofError, VerifyError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code, e.g. `"BAD_REQUEST"`.
    pub code: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation error: {0}")]
    Validation(String),

    /// Logged, never returned verbatim.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Malformed(e) => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<ProofError> for AppError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::Malformed(e) => Self::BadRequest(e.to_string()),
            ProofError::GenerationFailed(msg) => Self::Internal(msg),
        }
    }
}

impl From<BindingError> for AppError {
    fn from(err: BindingError) -> Self {
        Self::Validation(err.to_string())
    }
}
