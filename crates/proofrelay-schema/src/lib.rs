//! # proofrelay-schema — Envelope Structural Validation
//!
//! The first stage of ingestion. Turns an untyped JSON candidate into a
//! [`ProofEnvelope`](proofrelay_core::ProofEnvelope) or an ordered list of
//! [`FieldError`]s. No I/O, no partial success.

pub mod validate;

pub use validate::{validate, FieldError, FieldKind, FieldRule, ENVELOPE_RULES};
