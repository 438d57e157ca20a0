//! # Binding Tag Endpoint
//!
//! `POST /binding/tag` derives the binding tag for a context supplied in
//! the camelCase wire form (`chainId`, `escrowAddress`, `productId`,
//! `stage`, optional `schemaVersion` and `previousVCCid`).

use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tradeseal_binding::{binding_tag, BindingContextInput, ProtocolVersion};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct BindingTagResponse {
    /// 64 lowercase hex characters, no prefix.
    pub binding_tag: String,
    pub protocol_version: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/binding/tag", post(derive_tag))
}

async fn derive_tag(
    body: Result<Json<BindingContextInput>, JsonRejection>,
) -> Result<Json<BindingTagResponse>, AppError> {
    let input = extract_json(body)?;
    let ctx = input.validate()?;
    let tag = binding_tag(&ctx);
    Ok(Json(BindingTagResponse {
        binding_tag: tag.to_hex(),
        protocol_version: ProtocolVersion::for_context(&ctx).as_str().to_string(),
    }))
}
