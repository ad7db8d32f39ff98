//! # Proof Submission API
//!
//! `POST /v1/proofs` runs a submission through the ingestion pipeline.
//! The read endpoints project stored records and aggregate metrics; they
//! never mutate anything.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use proofrelay_core::{ProofId, ProofRecord};
use proofrelay_pipeline::Accepted;
use proofrelay_state::MetricsSummary;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// Size metrics of an accepted envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SizeMetricsView {
    /// Compact JSON size in bytes.
    pub raw_bytes: u64,
    /// Gzip-compressed size in bytes.
    pub gzip_bytes: u64,
}

/// Response to an accepted submission.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitProofResponse {
    pub id: String,
    pub metrics: SizeMetricsView,
}

impl From<Accepted> for SubmitProofResponse {
    fn from(accepted: Accepted) -> Self {
        Self {
            id: accepted.id.into(),
            metrics: SizeMetricsView {
                raw_bytes: accepted.metrics.raw_bytes,
                gzip_bytes: accepted.metrics.gzip_bytes,
            },
        }
    }
}

/// A stored proof and its verification state.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProofView {
    pub id: String,
    pub chain: String,
    pub timestamp: String,
    #[schema(value_type = Object)]
    pub payload: serde_json::Map<String, Value>,
    pub signature: String,
    pub received_at: DateTime<Utc>,
    pub size_raw: u64,
    pub size_gzip: u64,
    /// One of `pending`, `submitted`, `verified`, `failed`.
    pub verifier_status: String,
    pub verifier_message: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl From<ProofRecord> for ProofView {
    fn from(record: ProofRecord) -> Self {
        Self {
            id: record.envelope.id.into(),
            chain: record.envelope.chain,
            timestamp: record.envelope.timestamp,
            payload: record.envelope.payload,
            signature: record.envelope.signature,
            received_at: record.received_at,
            size_raw: record.size_raw,
            size_gzip: record.size_gzip,
            verifier_status: record.verifier_status.as_str().to_string(),
            verifier_message: record.verifier_message,
            verified_at: record.verified_at,
            attempts: record.attempts,
            last_attempt_at: record.last_attempt_at,
            next_attempt_at: record.next_attempt_at,
        }
    }
}

/// HTTP counters since process start.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HttpCounters {
    pub requests: u64,
    pub errors: u64,
}

/// Aggregate proof metrics.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProofMetricsResponse {
    pub total: u64,
    /// Record count per verifier status; every status is present.
    pub by_status: BTreeMap<String, u64>,
    /// Record count per chain.
    pub by_chain: BTreeMap<String, u64>,
    pub total_raw_bytes: u64,
    pub total_gzip_bytes: u64,
    pub http: HttpCounters,
}

impl ProofMetricsResponse {
    fn new(summary: MetricsSummary, http: HttpCounters) -> Self {
        Self {
            total: summary.total,
            by_status: summary
                .by_status
                .into_iter()
                .map(|(status, n)| (status.as_str().to_string(), n))
                .collect(),
            by_chain: summary.by_chain,
            total_raw_bytes: summary.total_raw_bytes,
            total_gzip_bytes: summary.total_gzip_bytes,
            http,
        }
    }
}

/// Build the proofs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/proofs", post(submit_proof))
        .route("/v1/proofs/metrics", get(proof_metrics))
        .route("/v1/proofs/:id", get(get_proof))
}

/// POST /v1/proofs: Submit a signed proof envelope.
#[utoipa::path(
    post,
    path = "/v1/proofs",
    request_body(content = Object, description = "Proof envelope: id, chain, timestamp, payload, signature"),
    responses(
        (status = 201, description = "Proof accepted and queued for verification", body = SubmitProofResponse),
        (status = 400, description = "Body is not JSON", body = crate::error::ErrorBody),
        (status = 401, description = "Invalid envelope signature or ingress credential", body = crate::error::ErrorBody),
        (status = 409, description = "A proof with this id already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Envelope failed validation", body = crate::error::ErrorBody),
    ),
    tag = "proofs"
)]
pub async fn submit_proof(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitProofResponse>), AppError> {
    let raw = extract_json(body)?;
    let accepted = state.pipeline.ingest(&raw).await?;
    Ok((StatusCode::CREATED, Json(accepted.into())))
}

/// GET /v1/proofs/:id: Look up a proof.
#[utoipa::path(
    get,
    path = "/v1/proofs/{id}",
    params(("id" = String, Path, description = "Proof ID")),
    responses(
        (status = 200, description = "Proof found", body = ProofView),
        (status = 404, description = "Proof not found", body = crate::error::ErrorBody),
    ),
    tag = "proofs"
)]
pub async fn get_proof(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProofView>, AppError> {
    let not_found = || AppError::NotFound(format!("proof {id} not found"));
    let proof_id = ProofId::new(id.clone()).map_err(|_| not_found())?;
    state
        .store
        .get_by_id(&proof_id)
        .await?
        .map(|record| Json(record.into()))
        .ok_or_else(not_found)
}

/// GET /v1/proofs/metrics: Aggregate counts and sizes.
#[utoipa::path(
    get,
    path = "/v1/proofs/metrics",
    responses(
        (status = 200, description = "Aggregate proof metrics", body = ProofMetricsResponse),
    ),
    tag = "proofs"
)]
pub async fn proof_metrics(State(state): State<AppState>) -> Result<Json<ProofMetricsResponse>, AppError> {
    let summary = state.store.aggregate_metrics().await?;
    let http = HttpCounters {
        requests: state.metrics.requests(),
        errors: state.metrics.errors(),
    };
    Ok(Json(ProofMetricsResponse::new(summary, http)))
}
