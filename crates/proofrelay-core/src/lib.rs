#![deny(missing_docs)]

//! # proofrelay-core — Foundational Types
//!
//! Every other crate in the workspace depends on this one. It has no
//! internal dependencies, only `serde`, `serde_json`, `serde_jcs`,
//! `thiserror`, `chrono` and `flate2`.
//!
//! ## Design Principles
//!
//! 1. **[`ProofEnvelope`] is the unit of input.** Once the schema validator
//!    produces one, every field has been checked and the envelope is never
//!    mutated again.
//!
//! 2. **[`CanonicalBytes`] is the sole path to signing input.** Signature
//!    verification accepts `&CanonicalBytes`, never raw bytes, so signer and
//!    verifier cannot disagree on serialization.
//!
//! 3. **[`VerifierStatus`] is a closed enum.** Status strings only exist at
//!    the serialization boundary.
//!
//! 4. **[`ProofRelayError`] hierarchy.** Structured errors with `thiserror`,
//!    no `.unwrap()` outside tests.

pub mod canonical;
pub mod envelope;
pub mod error;
pub mod metrics;
pub mod record;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use envelope::{ProofEnvelope, ProofId};
pub use error::{CanonicalizationError, ProofRelayError, ValidationError};
pub use metrics::SizeMetrics;
pub use record::{ProofRecord, VerifierStatus};
pub use temporal::parse_instant;
