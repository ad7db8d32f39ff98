//! # Envelope Validation
//!
//! ## Design
//!
//! Validation is a fixed table of [`FieldRule`]s, one per envelope field,
//! evaluated in table order. Every rule runs even after an earlier one
//! fails, so a submitter sees all problems at once and the error list is
//! identical for identical input.
//!
//! Each rule checks, in order: presence, JSON kind, then the field's extra
//! constraints. A field contributes at most one error.
//!
//! ## Security invariant
//!
//! Nothing downstream ever sees a partially validated envelope: the
//! [`ProofEnvelope`] is only built once the error list is empty.

use serde::Serialize;
use serde_json::{Map, Value};

use proofrelay_core::{parse_instant, ProofEnvelope, ProofId};

/// Maximum length of a proof identifier, in characters.
pub const MAX_ID_LEN: usize = 256;

/// Maximum length of a chain identifier, in characters.
pub const MAX_CHAIN_LEN: usize = 128;

/// JSON kinds a field may be required to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// A JSON object.
    Object,
}

impl FieldKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Object => value.is_object(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Object => "an object",
        }
    }
}

/// Additional constraint applied once a field has the right kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// String must be non-empty and at most this many characters.
    Length {
        /// Upper bound in characters.
        max: usize,
    },
    /// String must be non-empty.
    NonEmpty,
    /// String must parse as an ISO 8601 date-time.
    DateTime,
}

/// One row of the constraint table.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Top-level field name.
    pub field: &'static str,
    /// Required JSON kind.
    pub kind: FieldKind,
    /// Extra constraint, if any.
    pub constraint: Option<Constraint>,
}

/// The envelope shape, in evaluation order.
pub const ENVELOPE_RULES: &[FieldRule] = &[
    FieldRule {
        field: "id",
        kind: FieldKind::String,
        constraint: Some(Constraint::Length { max: MAX_ID_LEN }),
    },
    FieldRule {
        field: "chain",
        kind: FieldKind::String,
        constraint: Some(Constraint::Length { max: MAX_CHAIN_LEN }),
    },
    FieldRule {
        field: "timestamp",
        kind: FieldKind::String,
        constraint: Some(Constraint::DateTime),
    },
    FieldRule {
        field: "payload",
        kind: FieldKind::Object,
        constraint: None,
    },
    FieldRule {
        field: "signature",
        kind: FieldKind::String,
        constraint: Some(Constraint::NonEmpty),
    },
];

/// A single validation failure: where, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON path of the offending field (`$.id`, or `$` for the document).
    pub path: String,
    /// Human-readable reason.
    pub reason: String,
}

impl FieldError {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Validate an untyped candidate against [`ENVELOPE_RULES`].
///
/// Returns the typed envelope, or a non-empty list of errors in rule order.
pub fn validate(candidate: &Value) -> Result<ProofEnvelope, Vec<FieldError>> {
    let Some(obj) = candidate.as_object() else {
        return Err(vec![FieldError::new(
            "$",
            format!("envelope must be a JSON object, got {}", kind_of(candidate)),
        )]);
    };

    let errors: Vec<FieldError> = ENVELOPE_RULES
        .iter()
        .filter_map(|rule| check_rule(obj, rule))
        .collect();
    if !errors.is_empty() {
        return Err(errors);
    }

    build_envelope(obj).map_err(|e| vec![e])
}

fn check_rule(obj: &Map<String, Value>, rule: &FieldRule) -> Option<FieldError> {
    let path = format!("$.{}", rule.field);
    let value = match obj.get(rule.field) {
        None | Some(Value::Null) => return Some(FieldError::new(path, "is required")),
        Some(v) => v,
    };
    if !rule.kind.matches(value) {
        return Some(FieldError::new(
            path,
            format!("must be {}, got {}", rule.kind.name(), kind_of(value)),
        ));
    }
    let constraint = rule.constraint?;
    let s = value.as_str().unwrap_or_default();
    match constraint {
        Constraint::NonEmpty if s.is_empty() => Some(FieldError::new(path, "must not be empty")),
        Constraint::Length { .. } if s.is_empty() => Some(FieldError::new(path, "must not be empty")),
        Constraint::Length { max } if s.chars().count() > max => Some(FieldError::new(
            path,
            format!("must be at most {max} characters"),
        )),
        Constraint::DateTime => parse_instant(s)
            .err()
            .map(|_| FieldError::new(path, "must be a valid ISO 8601 date-time")),
        _ => None,
    }
}

fn build_envelope(obj: &Map<String, Value>) -> Result<ProofEnvelope, FieldError> {
    let string = |field: &str| obj.get(field).and_then(Value::as_str).unwrap_or_default().to_string();
    let id = ProofId::new(string("id")).map_err(|e| FieldError::new("$.id", e.to_string()))?;
    let payload = obj
        .get("payload")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| FieldError::new("$.payload", "must be an object"))?;
    Ok(ProofEnvelope {
        id,
        chain: string("chain"),
        timestamp: string("timestamp"),
        payload,
        signature: string("signature"),
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
