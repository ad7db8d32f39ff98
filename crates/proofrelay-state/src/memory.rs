//! In-memory [`ProofStore`].
//!
//! Locks are `parking_lot` and never held across an `.await`, so the async
//! trait methods complete without yielding.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use proofrelay_core::{ProofId, ProofRecord};

use crate::machine::{StatusGuard, StatusUpdate};
use crate::store::{MetricsSummary, ProofStore, StoreError};

/// Process-local proof store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryProofStore {
    records: RwLock<HashMap<ProofId, ProofRecord>>,
}

impl InMemoryProofStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ProofStore for InMemoryProofStore {
    async fn create(&self, record: ProofRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(record.id()) {
            return Err(StoreError::Conflict(record.id().clone()));
        }
        records.insert(record.id().clone(), record);
        Ok(())
    }

    async fn get_by_id(&self, id: &ProofId) -> Result<Option<ProofRecord>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: &ProofId,
        guard: StatusGuard,
        update: StatusUpdate,
    ) -> Result<ProofRecord, StoreError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        if !guard.matches(record) {
            return Err(StoreError::stale(id, guard));
        }
        update.apply_to(record);
        Ok(record.clone())
    }

    async fn list_eligible_for_reconciliation(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ProofId>, StoreError> {
        let records = self.records.read();
        let mut due: Vec<&ProofRecord> = records.values().filter(|r| r.is_due(now)).collect();
        due.sort_by(|a, b| a.received_at.cmp(&b.received_at).then_with(|| a.id().cmp(b.id())));
        Ok(due.into_iter().take(limit).map(|r| r.id().clone()).collect())
    }

    async fn aggregate_metrics(&self) -> Result<MetricsSummary, StoreError> {
        let records = self.records.read();
        let mut summary = MetricsSummary::empty();
        for record in records.values() {
            summary.add(record);
        }
        Ok(summary)
    }
}
