//! # Ed25519 Signing and Verification
//!
//! ## Security Invariant
//!
//! - Signing and verification take `&CanonicalBytes`, never raw bytes. The
//!   message is always the JCS form of an envelope's signable fields.
//! - Private keys are never serialized or logged. `Ed25519KeyPair` does not
//!   implement `Serialize`, and its `Debug` output is redacted.
//!
//! ## Encodings
//!
//! - Signatures travel as base64 (standard or URL-safe, padded or not).
//! - Public keys are configured as 64-char hex or base64 of 32 bytes.
//! - Private key seeds are stored as 64-char hex by the CLI.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use ed25519_dalek::{Signer, Verifier};
use proofrelay_core::CanonicalBytes;
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Decode base64 in any of the common alphabets.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = encoded.trim();
    STANDARD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .or_else(|_| URL_SAFE.decode(trimmed))
        .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed))
        .map_err(|e| CryptoError::Base64Decode(e.to_string()))
}

/// An Ed25519 public key (32 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create a public key from raw bytes, rejecting points that are not
    /// valid curve encodings.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Parse configured key material: 64 hex characters, or base64 of 32 bytes.
    pub fn parse(material: &str) -> Result<Self, CryptoError> {
        let material = material.trim();
        let bytes = if material.len() == 64 && material.chars().all(|c| c.is_ascii_hexdigit()) {
            hex::decode(material).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?
        } else {
            decode_base64(material)
                .map_err(|e| CryptoError::InvalidPublicKey(format!("not hex or base64: {e}")))?
        };
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidPublicKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_bytes(arr)
    }

    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", &self.to_hex()[..16])
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create a signature from raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Decode a base64 signature.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = decode_base64(encoded)?;
        let arr: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Encode the signature as standard padded base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Return the raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex::encode(&self.0[..8]))
    }
}

/// An Ed25519 key pair for signing envelopes.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand_core::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Create a key pair from a 64-character hex seed.
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            hex::decode(seed_hex.trim()).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?,
        );
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidPrivateKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(&seed))
    }

    /// The seed as hex, for writing key files. Wrapped so the copy is wiped.
    pub fn seed_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.signing_key.to_bytes()))
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

/// Verify an Ed25519 signature over canonical bytes.
///
/// Uses strict verification, rejecting small-order keys and non-canonical
/// signature encodings.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    public_key: &Ed25519PublicKey,
) -> Result<(), CryptoError> {
    let vk = public_key.to_verifying_key()?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
}
