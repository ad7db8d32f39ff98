//! # OpenAPI Specification
//!
//! Served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "proofrelay API",
        version = "0.3.0",
        description = "Ingress for signed zero-knowledge proof envelopes and their verification status."
    ),
    paths(
        crate::routes::proofs::submit_proof,
        crate::routes::proofs::get_proof,
        crate::routes::proofs::proof_metrics,
    ),
    components(schemas(
        crate::routes::proofs::SubmitProofResponse,
        crate::routes::proofs::SizeMetricsView,
        crate::routes::proofs::ProofView,
        crate::routes::proofs::ProofMetricsResponse,
        crate::routes::proofs::HttpCounters,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "proofs", description = "Proof submission and verification status"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
