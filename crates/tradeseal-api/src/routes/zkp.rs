//! # Value Commitment Endpoints
//!
//! - `POST /zkp/verify-value-commitment`
//! - `POST /zkp/generate-value-commitment-with-binding`
//! - `POST /zkp/commit-tx-hash`
//! - `POST /zkp/verify-tx-hash-commitment`
//!
//! Field names follow the proof service contract used by the marketplace
//! front end (`binding_tag_hex` optional on every call). A tag that is
//! present must be 32 bytes of hex; an empty string is a bad request.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tradeseal_zkp::{
    GenerateRequest, GenerateResponse, TxHashCommitRequest, TxHashCommitResponse, TxHashVerifyRequest,
    VerifyRequest, VerifyResponse,
};

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/zkp/verify-value-commitment", post(verify_value_commitment))
        .route(
            "/zkp/generate-value-commitment-with-binding",
            post(generate_value_commitment),
        )
        .route("/zkp/commit-tx-hash", post(commit_tx_hash))
        .route("/zkp/verify-tx-hash-commitment", post(verify_tx_hash_commitment))
}

async fn verify_value_commitment(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_json(body)?;
    let resp = req.execute(&state.verifier)?;
    Ok(Json(resp))
}

async fn generate_value_commitment(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let req = extract_json(body)?;
    let resp = req.execute(state.verifier.system())?;
    tracing::info!(
        bound = req.binding_tag_hex.is_some(),
        verified = resp.verified,
        "value commitment generated"
    );
    Ok(Json(resp))
}

async fn commit_tx_hash(
    State(state): State<AppState>,
    body: Result<Json<TxHashCommitRequest>, JsonRejection>,
) -> Result<Json<TxHashCommitResponse>, AppError> {
    let req = extract_json(body)?;
    let resp = req.execute(state.verifier.system())?;
    tracing::info!(
        bound = req.binding_tag_hex.is_some(),
        verified = resp.verified,
        "tx-hash commitment generated"
    );
    Ok(Json(resp))
}

async fn verify_tx_hash_commitment(
    State(state): State<AppState>,
    body: Result<Json<TxHashVerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_json(body)?;
    Ok(Json(req.execute(&state.verifier)?))
}
