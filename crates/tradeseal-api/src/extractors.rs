//! JSON body extraction with deserialization failures mapped to
//! [`AppError::BadRequest`].

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Handlers take `Result<Json<T>, JsonRejection>` and call this so that a
/// bad body produces the service's own error envelope.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}
