//! # Integration Tests for proofrelay-api
//!
//! Drives the full router with `oneshot`: health probes, submission through
//! every rejection class, record lookup, metrics, ingress auth, and the
//! OpenAPI document.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use zeroize::Zeroizing;

use proofrelay_api::config::AppConfig;
use proofrelay_api::state::AppState;
use proofrelay_core::{ProofEnvelope, ProofId};
use proofrelay_crypto::Ed25519KeyPair;

fn config_for(kp: &Ed25519KeyPair) -> AppConfig {
    AppConfig {
        proof_public_key: Some(kp.public_key().to_hex()),
        ..AppConfig::default()
    }
}

/// Helper: build the test app with auth disabled and a configured key.
fn test_app(kp: &Ed25519KeyPair) -> axum::Router {
    proofrelay_api::app(AppState::in_memory(config_for(kp)))
}

/// Helper: build the test app with ingress auth enabled.
fn test_app_with_auth(kp: &Ed25519KeyPair, token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(Zeroizing::new(token.to_string())),
        ..config_for(kp)
    };
    proofrelay_api::app(AppState::in_memory(config))
}

fn signed(kp: &Ed25519KeyPair, id: &str) -> Value {
    let mut envelope = ProofEnvelope {
        id: ProofId::new(id).unwrap(),
        chain: "starknet".into(),
        timestamp: "2025-01-01T00:00:00Z".into(),
        payload: json!({"proof": "0xabc", "publicInputs": [1, 2, 3]})
            .as_object()
            .cloned()
            .unwrap(),
        signature: String::new(),
    };
    envelope.signature = kp.sign(&envelope.signable_bytes().unwrap()).to_base64();
    serde_json::to_value(envelope).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app(&Ed25519KeyPair::generate());
    let response = app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = test_app(&Ed25519KeyPair::generate());
    let response = app.oneshot(get("/health/readiness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Submission ---------------------------------------------------------------

#[tokio::test]
async fn test_submit_valid_proof_returns_201_with_metrics() {
    let kp = Ed25519KeyPair::generate();
    let app = test_app(&kp);

    let response = app.clone().oneshot(post_json("/v1/proofs", &signed(&kp, "proof-1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], "proof-1");
    assert!(body["metrics"]["rawBytes"].as_u64().unwrap() > 0);
    assert!(body["metrics"]["gzipBytes"].as_u64().unwrap() > 0);

    let response = app.oneshot(get("/v1/proofs/proof-1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await;
    assert_eq!(record["verifierStatus"], "pending");
    assert_eq!(record["attempts"], 0);
    assert_eq!(record["chain"], "starknet");
    assert_eq!(record["sizeRaw"], body["metrics"]["rawBytes"]);
}

#[tokio::test]
async fn test_missing_field_returns_422_with_field_errors() {
    let kp = Ed25519KeyPair::generate();
    let app = test_app(&kp);
    let mut envelope = signed(&kp, "proof-1");
    envelope.as_object_mut().unwrap().remove("chain");

    let response = app.clone().oneshot(post_json("/v1/proofs", &envelope)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["path"], "$.chain");
    assert_eq!(body["error"]["details"][0]["reason"], "is required");

    let response = app.oneshot(get("/v1/proofs/proof-1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_signature_returns_401_and_stores_nothing() {
    let kp = Ed25519KeyPair::generate();
    let app = test_app(&kp);
    let forged = signed(&Ed25519KeyPair::generate(), "proof-1");

    let response = app.clone().oneshot(post_json("/v1/proofs", &forged)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(get("/v1/proofs/proof-1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_id_returns_409() {
    let kp = Ed25519KeyPair::generate();
    let app = test_app(&kp);
    let envelope = signed(&kp, "proof-1");

    let first = app.clone().oneshot(post_json("/v1/proofs", &envelope)).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = app.oneshot(post_json("/v1/proofs", &envelope)).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(second).await["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_malformed_json_returns_400() {
    let app = test_app(&Ed25519KeyPair::generate());
    let request = Request::builder()
        .method("POST")
        .uri("/v1/proofs")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_no_key_configured_accepts_unsigned_envelope() {
    let app = proofrelay_api::app(AppState::in_memory(AppConfig::default()));
    let mut envelope = signed(&Ed25519KeyPair::generate(), "proof-1");
    envelope["signature"] = json!("bm90LWNoZWNrZWQ=");
    let response = app.oneshot(post_json("/v1/proofs", &envelope)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_malformed_configured_key_rejects_without_exposing_detail() {
    let config = AppConfig {
        proof_public_key: Some("zz-not-a-key".into()),
        ..AppConfig::default()
    };
    let app = proofrelay_api::app(AppState::in_memory(config));
    let envelope = signed(&Ed25519KeyPair::generate(), "proof-1");

    let response = app.oneshot(post_json("/v1/proofs", &envelope)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let message = body_json(response).await["error"]["message"].as_str().unwrap().to_string();
    assert!(message.contains("signature could not be verified"), "{message}");
    assert!(!message.contains("zz-not-a-key"), "{message}");
    assert!(!message.contains("public key"), "{message}");
}

// -- Reads --------------------------------------------------------------------

#[tokio::test]
async fn test_unknown_proof_returns_404() {
    let app = test_app(&Ed25519KeyPair::generate());
    let response = app.oneshot(get("/v1/proofs/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_metrics_aggregate_by_status_and_chain() {
    let kp = Ed25519KeyPair::generate();
    let app = test_app(&kp);
    for id in ["a", "b"] {
        let response = app.clone().oneshot(post_json("/v1/proofs", &signed(&kp, id))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.oneshot(get("/v1/proofs/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["byStatus"]["pending"], 2);
    assert_eq!(body["byStatus"]["verified"], 0);
    assert_eq!(body["byChain"]["starknet"], 2);
    assert!(body["totalRawBytes"].as_u64().unwrap() > 0);
    assert!(body["totalGzipBytes"].as_u64().unwrap() > 0);
    assert_eq!(body["http"]["requests"], 2);
    assert_eq!(body["http"]["errors"], 0);
}

// -- Ingress Auth -------------------------------------------------------------

#[tokio::test]
async fn test_auth_required_when_token_configured() {
    let kp = Ed25519KeyPair::generate();
    let app = test_app_with_auth(&kp, "ingress-token");

    let response = app.clone().oneshot(post_json("/v1/proofs", &signed(&kp, "p1"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = post_json("/v1/proofs", &signed(&kp, "p1"));
    request
        .headers_mut()
        .insert("authorization", "Bearer ingress-token".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // Health probes stay open.
    let response = app.oneshot(get("/health/liveness")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = test_app(&Ed25519KeyPair::generate());
    let response = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["paths"]["/v1/proofs"].is_object());
    assert!(body["paths"]["/v1/proofs/{id}"].is_object());
}
