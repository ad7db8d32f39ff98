//! # Proof Store
//!
//! The persistence seam. Implementations must make
//! [`ProofStore::compare_and_set_status`] atomic: check the guard and write
//! the update in one step, so a stale snapshot can never overwrite a newer
//! state.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use proofrelay_core::{ProofId, ProofRecord, VerifierStatus};

use crate::machine::{StatusGuard, StatusUpdate};

/// Store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A record with this id already exists.
    #[error("proof {0} already exists")]
    Conflict(ProofId),

    /// No record with this id.
    #[error("proof {0} not found")]
    NotFound(ProofId),

    /// The record changed since the guard was taken.
    #[error("proof {id} changed concurrently (expected {expected_status} with {expected_attempts} attempts)")]
    Stale {
        /// The record id.
        id: ProofId,
        /// Guarded status.
        expected_status: VerifierStatus,
        /// Guarded attempt count.
        expected_attempts: u32,
    },

    /// The backend itself failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Build the `Stale` variant from a guard.
    pub fn stale(id: &ProofId, guard: StatusGuard) -> Self {
        Self::Stale {
            id: id.clone(),
            expected_status: guard.expected_status,
            expected_attempts: guard.expected_attempts,
        }
    }
}

/// Aggregate counts over all stored proofs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    /// Number of records.
    pub total: u64,
    /// Records per status. Every status is present, possibly with zero.
    pub by_status: BTreeMap<VerifierStatus, u64>,
    /// Records per chain.
    pub by_chain: BTreeMap<String, u64>,
    /// Sum of `size_raw`.
    pub total_raw_bytes: u64,
    /// Sum of `size_gzip`.
    pub total_gzip_bytes: u64,
}

impl MetricsSummary {
    /// An empty summary with every status zeroed.
    pub fn empty() -> Self {
        Self {
            by_status: VerifierStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            ..Self::default()
        }
    }

    /// Fold one record into the summary.
    pub fn add(&mut self, record: &ProofRecord) {
        self.total += 1;
        *self.by_status.entry(record.verifier_status).or_insert(0) += 1;
        *self
            .by_chain
            .entry(record.envelope.chain.clone())
            .or_insert(0) += 1;
        self.total_raw_bytes += record.size_raw;
        self.total_gzip_bytes += record.size_gzip;
    }
}

/// Durable storage for proof records.
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Conflict`] if the id
    /// exists; the existing record is left untouched.
    async fn create(&self, record: ProofRecord) -> Result<(), StoreError>;

    /// Fetch one record.
    async fn get_by_id(&self, id: &ProofId) -> Result<Option<ProofRecord>, StoreError>;

    /// Atomically apply `update` if the record still matches `guard`.
    ///
    /// Returns the updated record, [`StoreError::Stale`] if the guard no
    /// longer matches, or [`StoreError::NotFound`].
    async fn compare_and_set_status(
        &self,
        id: &ProofId,
        guard: StatusGuard,
        update: StatusUpdate,
    ) -> Result<ProofRecord, StoreError>;

    /// Ids due for reconciliation at `now`: every `pending` record, and
    /// `submitted` records whose `next_attempt_at` has passed. Oldest first.
    async fn list_eligible_for_reconciliation(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ProofId>, StoreError>;

    /// Counts and size totals over all records.
    async fn aggregate_metrics(&self) -> Result<MetricsSummary, StoreError>;
}
