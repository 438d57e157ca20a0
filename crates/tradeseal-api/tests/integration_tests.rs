//! # Integration Tests for tradeseal-api
//!
//! Health probes, value-commitment generation and verification with and
//! without binding tags, binding-tag derivation, and error mapping.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tradeseal_api::state::AppState;

const TAG_STAGE0: &str = "b3d9660812695cf688a896d66e3349c1eb1e0ceb81307d2360f0f1ca3a3ad875";
const TAG_STAGE1: &str = "b9749feb837be860b083e3bbd661febdb1b99f4c53dd94db5f3ccf05a69e9ef3";
const BLINDING: &str = "0x6e8ddd7cab9b5f6b5853343c140c841db7d95afc542f60142e962290a869c5a7";

fn test_app() -> axum::Router {
    tradeseal_api::app(AppState::new())
}

async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let text = body_string(response).await;
    (status, serde_json::from_str(&text).unwrap_or(Value::Null))
}

async fn generate(value: u64, tag: Option<&str>) -> Value {
    let mut body = json!({ "value": value, "blinding_hex": BLINDING });
    if let Some(tag) = tag {
        body["binding_tag_hex"] = json!(tag);
    }
    let (status, resp) = post_json("/zkp/generate-value-commitment-with-binding", body).await;
    assert_eq!(status, StatusCode::OK);
    resp
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Generation and Verification ----------------------------------------------

#[tokio::test]
async fn test_bound_proof_verifies_only_with_its_tag() {
    let gen = generate(1_000, Some(TAG_STAGE0)).await;
    assert_eq!(gen["verified"], json!(true));
    assert_eq!(gen["commitment"].as_str().unwrap().len(), 64);

    let verify = |tag: Option<&str>| {
        let mut body = json!({ "commitment": gen["commitment"], "proof": gen["proof"] });
        if let Some(tag) = tag {
            body["binding_tag_hex"] = json!(tag);
        }
        post_json("/zkp/verify-value-commitment", body)
    };

    let (status, resp) = verify(Some(TAG_STAGE0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp, json!({ "verified": true }));

    let (_, resp) = verify(Some(TAG_STAGE1)).await;
    assert_eq!(resp, json!({ "verified": false }));

    let (_, resp) = verify(None).await;
    assert_eq!(resp, json!({ "verified": false }));
}

#[tokio::test]
async fn test_unbound_proof_verifies_without_tag() {
    let gen = generate(42, None).await;
    let (status, resp) = post_json(
        "/zkp/verify-value-commitment",
        json!({ "commitment": gen["commitment"], "proof": gen["proof"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["verified"], json!(true));

    let (_, resp) = post_json(
        "/zkp/verify-value-commitment",
        json!({ "commitment": gen["commitment"], "proof": gen["proof"], "binding_tag_hex": TAG_STAGE0 }),
    )
    .await;
    assert_eq!(resp["verified"], json!(false));
}

#[tokio::test]
async fn test_garbage_proof_is_false_not_error() {
    let gen = generate(7, None).await;
    let (status, resp) = post_json(
        "/zkp/verify-value-commitment",
        json!({ "commitment": gen["commitment"], "proof": "deadbeef" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["verified"], json!(false));
}

#[tokio::test]
async fn test_malformed_commitment_is_bad_request() {
    let (status, resp) = post_json(
        "/zkp/verify-value-commitment",
        json!({ "commitment": "not-hex", "proof": "00" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"]["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn test_short_tag_is_bad_request() {
    let gen = generate(7, None).await;
    let (status, _) = post_json(
        "/zkp/verify-value-commitment",
        json!({ "commitment": gen["commitment"], "proof": gen["proof"], "binding_tag_hex": "abcd" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_tag_is_bad_request() {
    let gen = generate(7, None).await;
    let (status, resp) = post_json(
        "/zkp/verify-value-commitment",
        json!({ "commitment": gen["commitment"], "proof": gen["proof"], "binding_tag_hex": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"]["message"].as_str().unwrap().contains("bindingTag"));

    let (status, _) = post_json(
        "/zkp/generate-value-commitment-with-binding",
        json!({ "value": 7, "blinding_hex": BLINDING, "binding_tag_hex": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unparseable_body_is_bad_request() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/zkp/verify-value-commitment")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// -- Transaction Hash Commitments ---------------------------------------------

const TX_HASH: &str = "0x5f3a0c7e2b1d4f6a8c9e0b2d4f6a8c0e1f3b5d7a9c0e2f4b6d8a0c2e4f6b8d0a";

#[tokio::test]
async fn test_tx_hash_commitment_verifies_only_with_its_tag() {
    let (status, commit) = post_json(
        "/zkp/commit-tx-hash",
        json!({ "tx_hash": TX_HASH, "binding_tag_hex": TAG_STAGE0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(commit["verified"], json!(true));
    assert_eq!(commit["commitment"].as_str().unwrap().len(), 64);

    let verify = |tag: Value| {
        post_json(
            "/zkp/verify-tx-hash-commitment",
            json!({ "commitment": commit["commitment"], "proof": commit["proof"], "binding_tag_hex": tag }),
        )
    };
    let (status, resp) = verify(json!(TAG_STAGE0)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp, json!({ "verified": true }));
    let (_, resp) = verify(json!(TAG_STAGE1)).await;
    assert_eq!(resp, json!({ "verified": false }));
    let (_, resp) = verify(Value::Null).await;
    assert_eq!(resp, json!({ "verified": false }));
    let (status, _) = verify(json!("")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A value-commitment verifier does not accept it.
    let (_, resp) = post_json(
        "/zkp/verify-value-commitment",
        json!({ "commitment": commit["commitment"], "proof": commit["proof"], "binding_tag_hex": TAG_STAGE0 }),
    )
    .await;
    assert_eq!(resp["verified"], json!(false));
}

#[tokio::test]
async fn test_tx_hash_of_wrong_length_is_bad_request() {
    let (status, resp) = post_json("/zkp/commit-tx-hash", json!({ "tx_hash": "0x1234" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"]["message"].as_str().unwrap().contains("tx_hash"));
}

// -- Binding Tags -------------------------------------------------------------

#[tokio::test]
async fn test_binding_tag_fixed_vector() {
    let (status, resp) = post_json(
        "/binding/tag",
        json!({
            "chainId": 11155111,
            "escrowAddress": "0x1234567890123456789012345678901234567890",
            "productId": 1,
            "stage": 0,
            "schemaVersion": "1.0"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["binding_tag"], json!(TAG_STAGE0));
    assert_eq!(resp["protocol_version"], json!("zkp-bind-v1"));
}

#[tokio::test]
async fn test_binding_tag_with_previous_cid_uses_v2() {
    let (status, resp) = post_json(
        "/binding/tag",
        json!({
            "chainId": 11155111,
            "escrowAddress": "0x1234567890123456789012345678901234567890",
            "productId": 1,
            "stage": 2,
            "previousVCCid": "QmTestCid"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        resp["binding_tag"],
        json!("fd9741a788080e88e6c328e26dc4e932ad7f72244c2ad24e7fb7c82b75df9e83")
    );
    assert_eq!(resp["protocol_version"], json!("zkp-bind-v2"));
}

#[tokio::test]
async fn test_binding_tag_missing_field_is_unprocessable() {
    let (status, resp) = post_json(
        "/binding/tag",
        json!({
            "chainId": 11155111,
            "productId": 1,
            "stage": 0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp["error"]["message"].as_str().unwrap().contains("escrowAddress"));
}

#[tokio::test]
async fn test_binding_tag_rejects_bad_stage() {
    let (status, _) = post_json(
        "/binding/tag",
        json!({
            "chainId": 1,
            "escrowAddress": "0x1234567890123456789012345678901234567890",
            "productId": 1,
            "stage": 3
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_binding_tag_rejects_schema_that_absorbs_cid_prefix() {
    let body = |schema: &str, cid: &str| {
        json!({
            "chainId": 11155111,
            "escrowAddress": "0x1234567890123456789012345678901234567890",
            "productId": 1,
            "stage": 2,
            "schemaVersion": schema,
            "previousVCCid": cid
        })
    };
    let (status, honest) = post_json("/binding/tag", body("1.0", "QmX")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, resp) = post_json("/binding/tag", body("1.0Q", "mX")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp["error"]["message"].as_str().unwrap().contains("schemaVersion"));
    assert!(resp.get("binding_tag").is_none());

    let (status, _) = post_json("/binding/tag", body("1", ".0QmX")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(honest["protocol_version"], json!("zkp-bind-v2"));
}
