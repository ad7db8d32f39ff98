//! # Temporal Parsing
//!
//! Submitted envelopes carry their timestamp as a string. The string itself
//! is what gets signed, so it is stored verbatim; this module only decides
//! whether it denotes a valid instant.
//!
//! Accepted forms:
//! - RFC 3339 with offset or `Z` (`2025-01-01T00:00:00Z`, `2025-01-01T02:00:00+02:00`)
//! - ISO 8601 date-time without zone, read as UTC (`2025-01-01T00:00:00.123`)
//!
//! A bare calendar date is not a date-time and is rejected, as is any
//! surrounding whitespace: the signed string must be the instant itself.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::ValidationError;

/// Parse an ISO 8601 / RFC 3339 string into a UTC instant.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    Err(ValidationError::InvalidTimestamp {
        value: value.to_string(),
        reason: "expected an ISO 8601 date-time such as 2025-01-01T00:00:00Z".to_string(),
    })
}
