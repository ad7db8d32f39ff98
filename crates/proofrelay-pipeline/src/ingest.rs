//! # Ingestion Pipeline
//!
//! Synchronous, per-request path from untyped JSON to a persisted `pending`
//! record. Stage order is fixed: nothing is signature-checked before it is
//! well-formed, and nothing is stored before it is authentic.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use proofrelay_core::{ProofId, ProofRecord, SizeMetrics};
use proofrelay_crypto::{SignatureVerifier, VerificationOutcome};
use proofrelay_schema::{validate, FieldError};
use proofrelay_state::{ProofStore, StoreError};

use crate::reconciler::ReconcilerHandle;

/// A successfully ingested proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accepted {
    /// The stored proof's id.
    pub id: ProofId,
    /// Size metrics recorded with the proof.
    pub metrics: SizeMetrics,
}

/// Why a submission was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The envelope is malformed.
    #[error("envelope failed validation ({} error(s))", .0.len())]
    Validation(Vec<FieldError>),

    /// The signature did not verify.
    #[error("signature verification failed: {0}")]
    Authenticity(String),

    /// A proof with this id was already accepted.
    #[error("proof {0} already exists")]
    Conflict(ProofId),

    /// The store could not persist the record.
    #[error("failed to persist proof: {0}")]
    Store(String),

    /// The envelope could not be measured.
    #[error("failed to compute size metrics: {0}")]
    Internal(String),
}

/// Validates, authenticates and persists submitted proofs.
pub struct IngestionPipeline {
    store: Arc<dyn ProofStore>,
    signatures: SignatureVerifier,
    queue: Option<ReconcilerHandle>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("signatures", &self.signatures)
            .field("queue", &self.queue.is_some())
            .finish()
    }
}

impl IngestionPipeline {
    /// Create a pipeline that relies on the periodic scan alone.
    pub fn new(store: Arc<dyn ProofStore>, signatures: SignatureVerifier) -> Self {
        Self {
            store,
            signatures,
            queue: None,
        }
    }

    /// Notify a running reconciler of each accepted id.
    pub fn with_queue(mut self, queue: ReconcilerHandle) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Run a raw submission through every stage.
    pub async fn ingest(&self, raw: &Value) -> Result<Accepted, Rejection> {
        let envelope = validate(raw).map_err(|errors| {
            tracing::info!(errors = errors.len(), "rejected malformed envelope");
            Rejection::Validation(errors)
        })?;

        if let VerificationOutcome::Failed(reason) = self.signatures.verify(&envelope) {
            return Err(Rejection::Authenticity(reason));
        }

        let metrics = SizeMetrics::of(&envelope).map_err(|e| Rejection::Internal(e.to_string()))?;
        let id = envelope.id.clone();
        let chain = envelope.chain.clone();

        match self
            .store
            .create(ProofRecord::new_pending(envelope, metrics, Utc::now()))
            .await
        {
            Ok(()) => {}
            Err(StoreError::Conflict(existing)) => {
                tracing::info!(proof_id = %existing, "rejected duplicate proof id");
                return Err(Rejection::Conflict(existing));
            }
            Err(e) => {
                tracing::error!(proof_id = %id, error = %e, "failed to persist proof");
                return Err(Rejection::Store(e.to_string()));
            }
        }

        tracing::info!(
            proof_id = %id,
            %chain,
            raw_bytes = metrics.raw_bytes,
            gzip_bytes = metrics.gzip_bytes,
            "proof accepted"
        );
        if let Some(queue) = &self.queue {
            queue.enqueue(id.clone());
        }
        Ok(Accepted { id, metrics })
    }
}
