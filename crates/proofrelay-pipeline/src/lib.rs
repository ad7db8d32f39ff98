//! # proofrelay-pipeline — Ingestion and Reconciliation
//!
//! ## Ingestion (`ingest.rs`)
//!
//! `validate → verify signature → size metrics → create pending record →
//! enqueue`. Each stage short-circuits with a [`Rejection`]; nothing is
//! persisted unless every earlier stage passed.
//!
//! ## Reconciliation (`reconciler.rs`)
//!
//! A background task that selects due records, dispatches them to the
//! external verifier, and applies the verdict through the store's
//! compare-and-set. Transient failures are rescheduled with the delay from
//! [`BackoffPolicy`] until the retry budget runs out.
//!
//! ## Crash safety
//!
//! Dispatch writes `next_attempt_at` before the verifier is called. If the
//! process dies mid-attempt the record simply becomes due again once that
//! lease expires.

pub mod backoff;
pub mod ingest;
pub mod reconciler;

pub use backoff::{BackoffPolicy, JitterSource, NoJitter, RatioJitter};
pub use ingest::{Accepted, IngestionPipeline, Rejection};
pub use reconciler::{
    PassSummary, ReconcileOutcome, ReconcilerConfig, ReconcilerHandle, SkipReason, VerifierReconciler,
};
