//! # Verification State Machine
//!
//! ```text
//!            Dispatch                 Accept
//! PENDING ─────────────▶ SUBMITTED ─────────────▶ VERIFIED
//!                         │  ▲  │
//!       Dispatch/Reschedule └──┘  │ Reject / Exhaust
//!                                 ▼
//!                               FAILED
//! ```
//!
//! Status never moves backwards and nothing leaves a terminal status.
//! `attempts` only changes on `Dispatch`, by exactly one.

use chrono::{DateTime, Utc};
use thiserror::Error;

use proofrelay_core::{ProofRecord, VerifierStatus};

/// A requested lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Start a verifier attempt. Increments `attempts` and leases the record
    /// until `lease_until`.
    Dispatch {
        /// When the attempt starts.
        at: DateTime<Utc>,
        /// When the record becomes eligible again if this attempt is lost.
        lease_until: DateTime<Utc>,
    },
    /// The verifier accepted the proof.
    Accept {
        /// Verifier response text.
        message: String,
        /// Completion instant.
        at: DateTime<Utc>,
    },
    /// The verifier definitively rejected the proof.
    Reject {
        /// Rejection reason.
        message: String,
        /// Completion instant.
        at: DateTime<Utc>,
    },
    /// The retry budget is spent.
    Exhaust {
        /// Exhaustion summary including the last error.
        message: String,
        /// Completion instant.
        at: DateTime<Utc>,
    },
    /// A transient failure; retry at `next_attempt_at`.
    Reschedule {
        /// The transient error.
        message: String,
        /// Earliest next dispatch.
        next_attempt_at: DateTime<Utc>,
    },
}

impl Transition {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dispatch { .. } => "dispatch",
            Self::Accept { .. } => "accept",
            Self::Reject { .. } => "reject",
            Self::Exhaust { .. } => "exhaust",
            Self::Reschedule { .. } => "reschedule",
        }
    }

    /// Statuses this transition may start from.
    pub fn valid_from(&self) -> &'static [VerifierStatus] {
        match self {
            Self::Dispatch { .. } => &[VerifierStatus::Pending, VerifierStatus::Submitted],
            Self::Accept { .. }
            | Self::Reject { .. }
            | Self::Exhaust { .. }
            | Self::Reschedule { .. } => &[VerifierStatus::Submitted],
        }
    }

    /// Status the record ends in.
    pub fn target(&self) -> VerifierStatus {
        match self {
            Self::Dispatch { .. } | Self::Reschedule { .. } => VerifierStatus::Submitted,
            Self::Accept { .. } => VerifierStatus::Verified,
            Self::Reject { .. } | Self::Exhaust { .. } => VerifierStatus::Failed,
        }
    }
}

/// Errors from planning a transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The record is already `verified` or `failed`.
    #[error("proof is already terminal ({status}); {transition} ignored")]
    AlreadyTerminal {
        /// The terminal status.
        status: VerifierStatus,
        /// The refused transition.
        transition: &'static str,
    },
    /// The transition does not start from the record's status.
    #[error("invalid transition {transition} from {from}")]
    InvalidTransition {
        /// Current status.
        from: VerifierStatus,
        /// The refused transition.
        transition: &'static str,
    },
}

/// The snapshot a status change was planned from. A store only applies the
/// update if the record still matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusGuard {
    /// Status the record must currently have.
    pub expected_status: VerifierStatus,
    /// Attempt count the record must currently have.
    pub expected_attempts: u32,
}

impl StatusGuard {
    /// The guard matching a record as it is now.
    pub fn of(record: &ProofRecord) -> Self {
        Self {
            expected_status: record.verifier_status,
            expected_attempts: record.attempts,
        }
    }

    /// Whether `record` still matches this guard.
    pub fn matches(&self, record: &ProofRecord) -> bool {
        record.verifier_status == self.expected_status && record.attempts == self.expected_attempts
    }
}

/// The full set of mutable status fields after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// New status.
    pub verifier_status: VerifierStatus,
    /// New message.
    pub verifier_message: Option<String>,
    /// Terminal instant, if terminal.
    pub verified_at: Option<DateTime<Utc>>,
    /// New attempt count.
    pub attempts: u32,
    /// Last dispatch instant.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Next eligibility instant for `submitted` records.
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    fn from_record(record: &ProofRecord) -> Self {
        Self {
            verifier_status: record.verifier_status,
            verifier_message: record.verifier_message.clone(),
            verified_at: record.verified_at,
            attempts: record.attempts,
            last_attempt_at: record.last_attempt_at,
            next_attempt_at: record.next_attempt_at,
        }
    }

    /// Write these fields onto a record.
    pub fn apply_to(&self, record: &mut ProofRecord) {
        record.verifier_status = self.verifier_status;
        record.verifier_message = self.verifier_message.clone();
        record.verified_at = self.verified_at;
        record.attempts = self.attempts;
        record.last_attempt_at = self.last_attempt_at;
        record.next_attempt_at = self.next_attempt_at;
    }
}

/// Plan `transition` against `record`.
///
/// Pure: returns the guard the store must check and the fields it must
/// write. The record itself is untouched.
pub fn plan(
    record: &ProofRecord,
    transition: &Transition,
) -> Result<(StatusGuard, StatusUpdate), TransitionError> {
    let from = record.verifier_status;
    if from.is_terminal() {
        return Err(TransitionError::AlreadyTerminal {
            status: from,
            transition: transition.name(),
        });
    }
    if !transition.valid_from().contains(&from) {
        return Err(TransitionError::InvalidTransition {
            from,
            transition: transition.name(),
        });
    }

    let mut update = StatusUpdate::from_record(record);
    update.verifier_status = transition.target();
    match transition {
        Transition::Dispatch { at, lease_until } => {
            update.attempts = record.attempts.saturating_add(1);
            update.last_attempt_at = Some(*at);
            update.next_attempt_at = Some(*lease_until);
        }
        Transition::Accept { message, at }
        | Transition::Reject { message, at }
        | Transition::Exhaust { message, at } => {
            update.verifier_message = Some(message.clone());
            update.verified_at = Some(*at);
            update.next_attempt_at = None;
        }
        Transition::Reschedule {
            message,
            next_attempt_at,
        } => {
            update.verifier_message = Some(message.clone());
            update.next_attempt_at = Some(*next_attempt_at);
        }
    }
    Ok((StatusGuard::of(record), update))
}
