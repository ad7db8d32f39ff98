//! # Envelope Signature Verification
//!
//! The second stage of ingestion. Given the configured key material, decides
//! whether an envelope is authentic.
//!
//! ## Outcomes
//!
//! | Configuration           | Signature        | Outcome   |
//! |-------------------------|------------------|-----------|
//! | no key                  | anything         | `Skipped` |
//! | valid key               | valid            | `Passed`  |
//! | valid key               | wrong / malformed| `Failed`  |
//! | unparseable key         | anything         | `Failed`  |
//!
//! `Skipped` lets the envelope through without any authenticity guarantee,
//! so it is logged at WARN every time. An unparseable configured key fails
//! closed: the operator asked for verification and it cannot be performed.

use serde::{Deserialize, Serialize};

use proofrelay_core::ProofEnvelope;

use crate::ed25519::{self, Ed25519PublicKey, Ed25519Signature};

/// Client-facing reason when the configured key itself is unusable.
const UNVERIFIABLE: &str = "signature could not be verified";

/// Supported signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    /// Ed25519 over the JCS canonical form of the signable fields.
    #[default]
    Ed25519,
}

impl SignatureAlgorithm {
    /// Parse a configured algorithm name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Some(Self::Ed25519),
            _ => None,
        }
    }
}

/// Result of checking one envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum VerificationOutcome {
    /// The signature is valid under the configured key.
    Passed,
    /// No key is configured; authenticity was not checked.
    Skipped,
    /// The signature, or the configured key, is invalid.
    Failed(String),
}

impl VerificationOutcome {
    /// Whether the pipeline may proceed to persistence.
    pub fn permits_ingestion(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone)]
enum KeyState {
    Absent,
    Valid(Ed25519PublicKey),
    Invalid(String),
}

/// Checks envelope signatures against an optional configured public key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: KeyState,
    algorithm: SignatureAlgorithm,
}

impl SignatureVerifier {
    /// Build a verifier from raw configured key material.
    ///
    /// Malformed material is not an error here: it is remembered and turns
    /// every verification into `Failed`.
    pub fn new(public_key: Option<&str>, algorithm: SignatureAlgorithm) -> Self {
        let key = match public_key.map(str::trim).filter(|s| !s.is_empty()) {
            None => {
                tracing::warn!(
                    "no proof public key configured: signature verification is disabled \
                     and envelopes will be accepted without an authenticity check"
                );
                KeyState::Absent
            }
            Some(material) => match Ed25519PublicKey::parse(material) {
                Ok(pk) => {
                    tracing::info!(public_key = %pk, algorithm = ?algorithm, "proof signature verification enabled");
                    KeyState::Valid(pk)
                }
                Err(e) => {
                    tracing::error!(error = %e, "configured proof public key is invalid; all submissions will be rejected");
                    KeyState::Invalid(e.to_string())
                }
            },
        };
        Self { key, algorithm }
    }

    /// Build a verifier around an already-parsed key.
    pub fn with_key(public_key: Ed25519PublicKey, algorithm: SignatureAlgorithm) -> Self {
        Self {
            key: KeyState::Valid(public_key),
            algorithm,
        }
    }

    /// Whether a key (valid or not) is configured.
    pub fn is_enforcing(&self) -> bool {
        !matches!(self.key, KeyState::Absent)
    }

    /// The configured algorithm.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Check an envelope's signature.
    pub fn verify(&self, envelope: &ProofEnvelope) -> VerificationOutcome {
        let public_key = match &self.key {
            KeyState::Absent => {
                tracing::warn!(
                    proof_id = %envelope.id,
                    chain = %envelope.chain,
                    "signature verification skipped: no public key configured"
                );
                return VerificationOutcome::Skipped;
            }
            KeyState::Invalid(reason) => {
                tracing::error!(proof_id = %envelope.id, %reason, "configured proof public key is invalid; rejecting submission");
                return VerificationOutcome::Failed(UNVERIFIABLE.to_string());
            }
            KeyState::Valid(pk) => pk,
        };

        let outcome = match self.algorithm {
            SignatureAlgorithm::Ed25519 => verify_ed25519(envelope, public_key),
        };
        if let VerificationOutcome::Failed(reason) = &outcome {
            tracing::warn!(proof_id = %envelope.id, chain = %envelope.chain, %reason, "signature verification failed");
        }
        outcome
    }
}

fn verify_ed25519(envelope: &ProofEnvelope, public_key: &Ed25519PublicKey) -> VerificationOutcome {
    let signature = match Ed25519Signature::from_base64(&envelope.signature) {
        Ok(sig) => sig,
        Err(e) => return VerificationOutcome::Failed(e.to_string()),
    };
    let message = match envelope.signable_bytes() {
        Ok(bytes) => bytes,
        Err(e) => return VerificationOutcome::Failed(format!("canonicalization failed: {e}")),
    };
    match ed25519::verify(&message, &signature, public_key) {
        Ok(()) => VerificationOutcome::Passed,
        Err(e) => VerificationOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ed25519::Ed25519KeyPair;
    use proofrelay_core::ProofId;

    fn unsigned_envelope() -> ProofEnvelope {
        ProofEnvelope {
            id: ProofId::new("p1").unwrap(),
            chain: "starknet".into(),
            timestamp: "2025-01-01T00:00:00Z".into(),
            payload: serde_json::json!({"x": 1}).as_object().cloned().unwrap(),
            signature: String::new(),
        }
    }

    fn signed_envelope(kp: &Ed25519KeyPair) -> ProofEnvelope {
        let mut env = unsigned_envelope();
        env.signature = kp.sign(&env.signable_bytes().unwrap()).to_base64();
        env
    }

    #[test]
    fn valid_signature_passes() {
        let kp = Ed25519KeyPair::generate();
        let verifier = SignatureVerifier::new(Some(&kp.public_key().to_hex()), SignatureAlgorithm::Ed25519);
        assert_eq!(verifier.verify(&signed_envelope(&kp)), VerificationOutcome::Passed);
        assert!(verifier.is_enforcing());
    }

    #[test]
    fn wrong_key_fails() {
        let signer = Ed25519KeyPair::generate();
        let other = Ed25519KeyPair::generate();
        let verifier = SignatureVerifier::with_key(other.public_key(), SignatureAlgorithm::Ed25519);
        let outcome = verifier.verify(&signed_envelope(&signer));
        assert!(matches!(outcome, VerificationOutcome::Failed(_)));
        assert!(!outcome.permits_ingestion());
    }

    #[test]
    fn tampered_payload_fails() {
        let kp = Ed25519KeyPair::generate();
        let verifier = SignatureVerifier::with_key(kp.public_key(), SignatureAlgorithm::Ed25519);
        let mut env = signed_envelope(&kp);
        env.payload.insert("x".into(), serde_json::json!(2));
        assert!(matches!(verifier.verify(&env), VerificationOutcome::Failed(_)));
    }

    #[test]
    fn no_key_skips() {
        let verifier = SignatureVerifier::new(None, SignatureAlgorithm::Ed25519);
        let outcome = verifier.verify(&unsigned_envelope());
        assert_eq!(outcome, VerificationOutcome::Skipped);
        assert!(outcome.permits_ingestion());
        assert!(!verifier.is_enforcing());
    }

    #[test]
    fn blank_key_material_is_treated_as_absent() {
        let verifier = SignatureVerifier::new(Some("   "), SignatureAlgorithm::Ed25519);
        assert_eq!(verifier.verify(&unsigned_envelope()), VerificationOutcome::Skipped);
    }

    #[test]
    fn malformed_base64_signature_fails() {
        let kp = Ed25519KeyPair::generate();
        let verifier = SignatureVerifier::with_key(kp.public_key(), SignatureAlgorithm::Ed25519);
        let mut env = unsigned_envelope();
        env.signature = "!!!not base64!!!".into();
        match verifier.verify(&env) {
            VerificationOutcome::Failed(reason) => assert!(reason.contains("base64"), "{reason}"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn malformed_key_material_fails_closed() {
        let kp = Ed25519KeyPair::generate();
        let verifier = SignatureVerifier::new(Some("zz-not-a-key"), SignatureAlgorithm::Ed25519);
        assert!(verifier.is_enforcing());
        match verifier.verify(&signed_envelope(&kp)) {
            VerificationOutcome::Failed(reason) => {
                assert_eq!(reason, "signature could not be verified");
                assert!(!reason.contains("zz-not-a-key"));
                assert!(!reason.contains("public key"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn algorithm_names() {
        assert_eq!(SignatureAlgorithm::from_name("Ed25519"), Some(SignatureAlgorithm::Ed25519));
        assert_eq!(SignatureAlgorithm::from_name("rsa"), None);
    }

    #[test]
    fn outcome_serializes_with_reason() {
        let json = serde_json::to_value(VerificationOutcome::Failed("bad".into())).unwrap();
        assert_eq!(json, serde_json::json!({"outcome": "failed", "reason": "bad"}));
    }
}
