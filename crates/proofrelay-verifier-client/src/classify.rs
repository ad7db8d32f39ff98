//! Response classification.

use serde_json::Value;

use crate::error::{TerminalVerifierError, TransientVerifierError};

/// Longest response body kept in a verdict message.
const MAX_BODY_CHARS: usize = 512;

/// Outcome of one verifier attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifierVerdict {
    /// The verifier accepted the proof.
    Accepted {
        /// Text recorded as the proof's verifier message.
        message: String,
    },
    /// The verifier definitively rejected the proof.
    Rejected(TerminalVerifierError),
    /// The attempt failed in a way that may succeed later.
    Transient(TransientVerifierError),
}

impl VerifierVerdict {
    /// Whether a later attempt could change the outcome.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Classify an HTTP response from the verifier.
pub fn classify(status: u16, body: &str) -> VerifierVerdict {
    match status {
        200..=299 => classify_success(status, body),
        408 | 429 => VerifierVerdict::Transient(TransientVerifierError::Status {
            status,
            body: truncate(body),
        }),
        400..=499 => VerifierVerdict::Rejected(TerminalVerifierError::Status {
            status,
            body: truncate(body),
        }),
        // 5xx, and anything we do not recognise.
        _ => VerifierVerdict::Transient(TransientVerifierError::Status {
            status,
            body: truncate(body),
        }),
    }
}

fn classify_success(status: u16, body: &str) -> VerifierVerdict {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(detail_text);

    if parsed.as_ref().and_then(|v| v.get("verified")) == Some(&Value::Bool(false)) {
        return VerifierVerdict::Rejected(TerminalVerifierError::NotVerified(
            detail.unwrap_or_else(|| truncate(body)),
        ));
    }
    VerifierVerdict::Accepted {
        message: detail.unwrap_or_else(|| format!("accepted by verifier (HTTP {status})")),
    }
}

fn detail_text(body: &Value) -> Option<String> {
    ["message", "reason", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(truncate)
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_BODY_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_BODY_CHARS).collect();
    out.push('…');
    out
}
