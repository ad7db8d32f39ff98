//! # Error Hierarchy
//!
//! Structured error types shared across the workspace, built with
//! `thiserror`. Each subsystem crate defines its own enum for the failures it
//! owns; the types here cover what every crate touches: canonical
//! serialization, identifier validation and size accounting.

use thiserror::Error;

/// Top-level error type for core operations.
#[derive(Error, Debug)]
pub enum ProofRelayError {
    /// Canonicalization failure while producing signing input.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O error (compression during size accounting).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes.
///
/// Carries the rejected input so operators can diagnose bad submissions
/// without guesswork.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Proof identifiers must be non-empty.
    #[error("invalid proof ID: must be non-empty")]
    EmptyProofId,

    /// Timestamp string is not a valid ISO 8601 date-time.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
