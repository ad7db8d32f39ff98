//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps pipeline rejections and store failures to HTTP status codes with a
//! JSON body of error code, message, and optional details. Internal error
//! details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use proofrelay_pipeline::Rejection;
use proofrelay_schema::FieldError;
use proofrelay_state::StoreError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Field errors for 422 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Envelope failed schema validation (422). Carries every field error.
    #[error("envelope failed validation with {} error(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials, or an invalid envelope signature (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict with an existing resource (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match &self {
            Self::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Validation(errors) => Self::Validation(errors),
            Rejection::Authenticity(reason) => Self::Unauthorized(format!("invalid envelope signature: {reason}")),
            Rejection::Conflict(id) => Self::Conflict(format!("proof {id} already exists")),
            other @ (Rejection::Store(_) | Rejection::Internal(_)) => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(format!("proof {id}")),
            StoreError::Conflict(id) => Self::Conflict(format!("proof {id} already exists")),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofrelay_core::ProofId;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::Validation(vec![]), StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, "CONFLICT"),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code), "{err:?}");
        }
    }

    #[test]
    fn rejection_mapping() {
        let id = ProofId::new("p1").unwrap();
        let status = |r: Rejection| AppError::from(r).status_and_code().0;
        assert_eq!(status(Rejection::Validation(vec![])), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status(Rejection::Authenticity("bad".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(Rejection::Conflict(id)), StatusCode::CONFLICT);
        assert_eq!(status(Rejection::Store("down".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status(Rejection::Internal("gzip".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_error_mapping() {
        let id = ProofId::new("p1").unwrap();
        assert!(matches!(AppError::from(StoreError::NotFound(id)), AppError::NotFound(_)));
        assert!(matches!(
            AppError::from(StoreError::Backend("pool timed out".into())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn error_body_omits_empty_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "TEST".to_string(),
                message: "test message".to_string(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("TEST"));
        assert!(!json.contains("details"));
    }

    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn validation_response_lists_field_errors() {
        let errors = vec![
            FieldError {
                path: "$.chain".into(),
                reason: "is required".into(),
            },
            FieldError {
                path: "$.payload".into(),
                reason: "must be an object, got array".into(),
            },
        ];
        let (status, body) = response_parts(AppError::Validation(errors)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let details = body.error.details.unwrap();
        assert_eq!(details[0]["path"], "$.chain");
        assert_eq!(details[1]["reason"], "must be an object, got array");
    }

    #[tokio::test]
    async fn internal_response_hides_details() {
        let (status, body) = response_parts(AppError::Internal("db connection failed".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn conflict_response_names_the_id() {
        let id = ProofId::new("dup-1").unwrap();
        let (status, body) = response_parts(Rejection::Conflict(id).into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.error.message.contains("dup-1"));
    }
}
