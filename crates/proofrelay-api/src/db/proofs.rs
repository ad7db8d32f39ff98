//! Proof persistence on the `proofs` table.
//!
//! The compare-and-set is a single conditional `UPDATE ... RETURNING`, so
//! Postgres row locking provides the atomicity the reconciler relies on.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use proofrelay_core::{ProofEnvelope, ProofId, ProofRecord, VerifierStatus};
use proofrelay_state::{MetricsSummary, ProofStore, StatusGuard, StatusUpdate, StoreError};

const RECORD_COLUMNS: &str = "id, chain, \"timestamp\", payload, signature, received_at, size_raw, size_gzip, \
     verifier_status, verifier_message, verified_at, attempts, last_attempt_at, next_attempt_at";

/// [`ProofStore`] backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgProofStore {
    pool: PgPool,
}

impl PgProofStore {
    /// Wrap a migrated pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_i64(value: u64, column: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("{column} {value} does not fit BIGINT")))
}

fn to_i32(value: u32, column: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("{column} {value} does not fit INTEGER")))
}

#[async_trait]
impl ProofStore for PgProofStore {
    async fn create(&self, record: ProofRecord) -> Result<(), StoreError> {
        let payload = serde_json::Value::Object(record.envelope.payload.clone());
        let result = sqlx::query(
            "INSERT INTO proofs (id, chain, \"timestamp\", payload, signature, received_at, size_raw, size_gzip,
                                 verifier_status, verifier_message, verified_at, attempts, last_attempt_at, next_attempt_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(record.envelope.id.as_str())
        .bind(&record.envelope.chain)
        .bind(&record.envelope.timestamp)
        .bind(&payload)
        .bind(&record.envelope.signature)
        .bind(record.received_at)
        .bind(to_i64(record.size_raw, "size_raw")?)
        .bind(to_i64(record.size_gzip, "size_gzip")?)
        .bind(record.verifier_status.as_str())
        .bind(&record.verifier_message)
        .bind(record.verified_at)
        .bind(to_i32(record.attempts, "attempts")?)
        .bind(record.last_attempt_at)
        .bind(record.next_attempt_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(record.envelope.id));
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &ProofId) -> Result<Option<ProofRecord>, StoreError> {
        let row = sqlx::query_as::<_, ProofRow>(&format!("SELECT {RECORD_COLUMNS} FROM proofs WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(ProofRow::into_record).transpose()
    }

    async fn compare_and_set_status(
        &self,
        id: &ProofId,
        guard: StatusGuard,
        update: StatusUpdate,
    ) -> Result<ProofRecord, StoreError> {
        let row = sqlx::query_as::<_, ProofRow>(&format!(
            "UPDATE proofs
             SET verifier_status = $4, verifier_message = $5, verified_at = $6,
                 attempts = $7, last_attempt_at = $8, next_attempt_at = $9
             WHERE id = $1 AND verifier_status = $2 AND attempts = $3
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(guard.expected_status.as_str())
        .bind(to_i32(guard.expected_attempts, "attempts")?)
        .bind(update.verifier_status.as_str())
        .bind(&update.verifier_message)
        .bind(update.verified_at)
        .bind(to_i32(update.attempts, "attempts")?)
        .bind(update.last_attempt_at)
        .bind(update.next_attempt_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        if let Some(row) = row {
            return row.into_record();
        }

        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM proofs WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match exists {
            Some(_) => Err(StoreError::stale(id, guard)),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    async fn list_eligible_for_reconciliation(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ProofId>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM proofs
             WHERE verifier_status = 'pending'
                OR (verifier_status = 'submitted' AND (next_attempt_at IS NULL OR next_attempt_at <= $1))
             ORDER BY received_at, id
             LIMIT $2",
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        ids.into_iter()
            .map(|id| ProofId::new(id).map_err(|e| StoreError::Backend(e.to_string())))
            .collect()
    }

    async fn aggregate_metrics(&self) -> Result<MetricsSummary, StoreError> {
        let rows: Vec<(String, String, i64, i64, i64)> = sqlx::query_as(
            "SELECT verifier_status, chain, COUNT(*),
                    COALESCE(SUM(size_raw), 0)::BIGINT, COALESCE(SUM(size_gzip), 0)::BIGINT
             FROM proofs
             GROUP BY verifier_status, chain",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut summary = MetricsSummary::empty();
        let mut by_chain: BTreeMap<String, u64> = BTreeMap::new();
        for (status, chain, count, raw, gzip) in rows {
            let status = parse_status(&status)?;
            let count = count.max(0) as u64;
            summary.total += count;
            *summary.by_status.entry(status).or_insert(0) += count;
            *by_chain.entry(chain).or_insert(0) += count;
            summary.total_raw_bytes += raw.max(0) as u64;
            summary.total_gzip_bytes += gzip.max(0) as u64;
        }
        summary.by_chain = by_chain;
        Ok(summary)
    }
}

fn parse_status(name: &str) -> Result<VerifierStatus, StoreError> {
    VerifierStatus::from_name(name).ok_or_else(|| StoreError::Backend(format!("unknown verifier_status {name:?}")))
}

/// Internal row type for SQLx mapping.
#[derive(Debug, sqlx::FromRow)]
struct ProofRow {
    id: String,
    chain: String,
    timestamp: String,
    payload: serde_json::Value,
    signature: String,
    received_at: DateTime<Utc>,
    size_raw: i64,
    size_gzip: i64,
    verifier_status: String,
    verifier_message: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    attempts: i32,
    last_attempt_at: Option<DateTime<Utc>>,
    next_attempt_at: Option<DateTime<Utc>>,
}

impl ProofRow {
    fn into_record(self) -> Result<ProofRecord, StoreError> {
        let corrupt = |what: String| StoreError::Backend(format!("corrupt row {}: {what}", self.id));
        let id = ProofId::new(self.id.clone()).map_err(|e| corrupt(e.to_string()))?;
        let payload = match self.payload {
            serde_json::Value::Object(map) => map,
            other => return Err(corrupt(format!("payload is not an object: {other}"))),
        };
        let verifier_status = parse_status(&self.verifier_status)?;
        let size_raw = u64::try_from(self.size_raw).map_err(|_| corrupt("negative size_raw".into()))?;
        let size_gzip = u64::try_from(self.size_gzip).map_err(|_| corrupt("negative size_gzip".into()))?;
        let attempts = u32::try_from(self.attempts).map_err(|_| corrupt("negative attempts".into()))?;

        Ok(ProofRecord {
            envelope: ProofEnvelope {
                id,
                chain: self.chain,
                timestamp: self.timestamp,
                payload,
                signature: self.signature,
            },
            received_at: self.received_at,
            size_raw,
            size_gzip,
            verifier_status,
            verifier_message: self.verifier_message,
            verified_at: self.verified_at,
            attempts,
            last_attempt_at: self.last_attempt_at,
            next_attempt_at: self.next_attempt_at,
        })
    }
}
