//! # Proof Envelope
//!
//! The submitted proof structure after schema validation. Envelopes are
//! immutable: the signature covers `id`, `chain`, `timestamp` and `payload`,
//! so nothing about them may change between verification and persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, ValidationError};
use crate::temporal::parse_instant;

/// Globally unique, opaque proof identifier. Primary key of every record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProofId(String);

impl ProofId {
    /// Create a proof identifier, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValidationError::EmptyProofId);
        }
        Ok(Self(id))
    }

    /// Access the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProofId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProofId> for String {
    fn from(id: ProofId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ProofId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A structurally valid proof submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofEnvelope {
    /// Unique proof identifier.
    pub id: ProofId,
    /// Identifier of the origin ledger (e.g. `starknet`).
    pub chain: String,
    /// ISO 8601 timestamp exactly as submitted.
    pub timestamp: String,
    /// Opaque proof payload.
    pub payload: Map<String, Value>,
    /// Base64-encoded signature over [`ProofEnvelope::signable_bytes`].
    pub signature: String,
}

/// The signed portion of an envelope, in the shape that gets canonicalized.
#[derive(Serialize)]
struct SignableFields<'a> {
    id: &'a str,
    chain: &'a str,
    timestamp: &'a str,
    payload: &'a Map<String, Value>,
}

impl ProofEnvelope {
    /// Canonical bytes of `{id, chain, timestamp, payload}`.
    ///
    /// This is the exact message a submitter signs and the verifier checks.
    pub fn signable_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(&SignableFields {
            id: self.id.as_str(),
            chain: &self.chain,
            timestamp: &self.timestamp,
            payload: &self.payload,
        })
    }

    /// The instant denoted by `timestamp`.
    ///
    /// Always succeeds for envelopes produced by the schema validator.
    pub fn issued_at(&self) -> Result<DateTime<Utc>, ValidationError> {
        parse_instant(&self.timestamp)
    }
}
