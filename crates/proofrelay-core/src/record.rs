//! # Proof Record
//!
//! The persisted representation of an accepted envelope. Envelope fields,
//! `received_at` and the size counts are fixed at creation; the status
//! fields are only ever written by the reconciler through the store's
//! compare-and-set operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::{ProofEnvelope, ProofId};
use crate::metrics::SizeMetrics;

/// Verification lifecycle status of a proof.
///
/// ```text
/// PENDING ─dispatch──▶ SUBMITTED ─accept──▶ VERIFIED
///                        │  ▲
///                        │  └─ reschedule (transient failure)
///                        └────reject / exhaust──▶ FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierStatus {
    /// Accepted and persisted, not yet dispatched to the verifier.
    Pending,
    /// At least one verifier attempt has been dispatched.
    Submitted,
    /// The verifier accepted the proof. Terminal.
    Verified,
    /// The verifier rejected the proof or the retry budget ran out. Terminal.
    Failed,
}

impl VerifierStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [VerifierStatus; 4] = [
        Self::Pending,
        Self::Submitted,
        Self::Verified,
        Self::Failed,
    ];

    /// Return the canonical status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }

    /// Convert a canonical status name back into a `VerifierStatus`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            "verified" => Some(Self::Verified),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether no further transitions are permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }
}

impl std::fmt::Display for VerifierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted proof and its verification state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRecord {
    /// The accepted envelope.
    #[serde(flatten)]
    pub envelope: ProofEnvelope,
    /// When the pipeline accepted the envelope.
    pub received_at: DateTime<Utc>,
    /// Compact JSON size of the envelope in bytes.
    pub size_raw: u64,
    /// Gzip-compressed size of the envelope in bytes.
    pub size_gzip: u64,
    /// Current lifecycle status.
    pub verifier_status: VerifierStatus,
    /// Result text of the most recent reconciliation attempt.
    #[serde(default)]
    pub verifier_message: Option<String>,
    /// When the record reached a terminal status.
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    /// Number of reconciliation attempts dispatched so far.
    pub attempts: u32,
    /// When the latest attempt was dispatched.
    #[serde(default)]
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Earliest instant a `submitted` record may be dispatched again.
    #[serde(default)]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl ProofRecord {
    /// Build the initial `pending` record for a freshly accepted envelope.
    pub fn new_pending(
        envelope: ProofEnvelope,
        metrics: SizeMetrics,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            envelope,
            received_at,
            size_raw: metrics.raw_bytes,
            size_gzip: metrics.gzip_bytes,
            verifier_status: VerifierStatus::Pending,
            verifier_message: None,
            verified_at: None,
            attempts: 0,
            last_attempt_at: None,
            next_attempt_at: None,
        }
    }

    /// The record's primary key.
    pub fn id(&self) -> &ProofId {
        &self.envelope.id
    }

    /// Size metrics computed at ingestion.
    pub fn size_metrics(&self) -> SizeMetrics {
        SizeMetrics {
            raw_bytes: self.size_raw,
            gzip_bytes: self.size_gzip,
        }
    }

    /// Whether the reconciler may dispatch an attempt for this record at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.verifier_status {
            VerifierStatus::Pending => true,
            VerifierStatus::Submitted => self.next_attempt_at.map_or(true, |due| due <= now),
            VerifierStatus::Verified | VerifierStatus::Failed => false,
        }
    }
}
