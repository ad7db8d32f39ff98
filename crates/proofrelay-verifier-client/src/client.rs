//! The [`ExternalVerifier`] seam and its HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use url::Url;

use proofrelay_core::ProofEnvelope;

use crate::classify::{classify, VerifierVerdict};
use crate::config::{ConfigError, VerifierConfig};
use crate::error::{TransientVerifierError, VerifierError};

/// Something that can pass judgement on a proof.
#[async_trait]
pub trait ExternalVerifier: Send + Sync {
    /// Submit the full envelope and report the verdict. Never fails: every
    /// error is folded into a verdict.
    async fn submit(&self, envelope: &ProofEnvelope) -> VerifierVerdict;
}

/// Posts envelopes as JSON to the configured verifier endpoint.
#[derive(Debug, Clone)]
pub struct VerifierClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl VerifierClient {
    /// Create a client from configuration.
    pub fn new(config: VerifierConfig) -> Result<Self, VerifierError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(VerifierError::Client)?;
        Ok(Self {
            http,
            endpoint: config.endpoint,
            timeout,
        })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ExternalVerifier for VerifierClient {
    async fn submit(&self, envelope: &ProofEnvelope) -> VerifierVerdict {
        let response = match self
            .http
            .post(self.endpoint.clone())
            .json(envelope)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return VerifierVerdict::Transient(TransientVerifierError::Timeout(
                    self.timeout.as_millis() as u64,
                ))
            }
            Err(e) => return VerifierVerdict::Transient(TransientVerifierError::Transport(e.to_string())),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return VerifierVerdict::Transient(TransientVerifierError::Timeout(
                    self.timeout.as_millis() as u64,
                ))
            }
            Err(e) => {
                return VerifierVerdict::Transient(TransientVerifierError::Transport(format!(
                    "failed to read response body (status {status}): {e}"
                )))
            }
        };

        let verdict = classify(status, &body);
        tracing::debug!(proof_id = %envelope.id, status, transient = verdict.is_transient(), "verifier responded");
        verdict
    }
}
