//! # Application State
//!
//! Shared handles passed to every route handler. Clone-friendly: every
//! field is behind an `Arc`.

use std::sync::Arc;

use proofrelay_crypto::SignatureVerifier;
use proofrelay_pipeline::{IngestionPipeline, ReconcilerHandle};
use proofrelay_state::{InMemoryProofStore, ProofStore};

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Ingestion path for `POST /v1/proofs`.
    pub pipeline: Arc<IngestionPipeline>,
    /// Read access for the query endpoints.
    pub store: Arc<dyn ProofStore>,
    /// Process configuration.
    pub config: Arc<AppConfig>,
    /// HTTP request counters.
    pub metrics: ApiMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire the pipeline over `store`. When `queue` is present, accepted ids
    /// are pushed to the running reconciler.
    pub fn new(config: AppConfig, store: Arc<dyn ProofStore>, queue: Option<ReconcilerHandle>) -> Self {
        let signatures = SignatureVerifier::new(config.proof_public_key.as_deref(), config.signature_algorithm);
        let mut pipeline = IngestionPipeline::new(store.clone(), signatures);
        if let Some(queue) = queue {
            pipeline = pipeline.with_queue(queue);
        }
        Self {
            pipeline: Arc::new(pipeline),
            store,
            config: Arc::new(config),
            metrics: ApiMetrics::new(),
        }
    }

    /// In-memory store, no reconciler.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(InMemoryProofStore::new()), None)
    }
}
