//! Verifier client configuration.
//!
//! Custom `Debug` implementation redacts the `api_token` field to prevent
//! credential leakage in log output.

use url::Url;
use zeroize::Zeroizing;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where and how to reach the external verifier.
#[derive(Clone)]
pub struct VerifierConfig {
    /// Endpoint that receives `POST`ed envelopes.
    pub endpoint: Url,
    /// Bearer credential. `None` sends no `Authorization` header.
    pub api_token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("endpoint", &self.endpoint)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl VerifierConfig {
    /// Configuration with the default timeout and no credential.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set the bearer credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(Zeroizing::new(token.into()));
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when `VERIFIER_URL` is unset or blank, meaning no
    /// verifier is configured.
    ///
    /// Variables:
    /// - `VERIFIER_URL`
    /// - `VERIFIER_API_TOKEN` (optional)
    /// - `VERIFIER_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw) = non_blank_var("VERIFIER_URL") else {
            return Ok(None);
        };
        let endpoint = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("VERIFIER_URL".to_string(), e.to_string()))?;
        let timeout_secs = match non_blank_var("VERIFIER_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(s) => s
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(s.clone()))?,
        };
        Ok(Some(Self {
            endpoint,
            api_token: non_blank_var("VERIFIER_API_TOKEN").map(Zeroizing::new),
            timeout_secs,
        }))
    }
}

fn non_blank_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("VERIFIER_TIMEOUT_SECS must be a positive integer, got {0:?}")]
    InvalidTimeout(String),
    #[error("VERIFIER_API_TOKEN contains characters not allowed in a header")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_timeout() {
        let cfg = VerifierConfig::new("http://127.0.0.1:9000/verify".parse().unwrap());
        assert_eq!(cfg.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(cfg.api_token.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = VerifierConfig::new("http://127.0.0.1:9000".parse().unwrap()).with_token("s3cret");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("s3cret"));
        assert!(dbg.contains("[REDACTED]"));
    }

    // Env-mutating cases live in one test so they cannot race each other.
    #[test]
    fn from_env_reads_verifier_variables() {
        std::env::remove_var("VERIFIER_URL");
        assert!(VerifierConfig::from_env().unwrap().is_none());

        std::env::set_var("VERIFIER_URL", "not a url");
        assert!(matches!(
            VerifierConfig::from_env(),
            Err(ConfigError::InvalidUrl(_, _))
        ));

        std::env::set_var("VERIFIER_URL", "https://verifier.example/v1/verify");
        std::env::set_var("VERIFIER_API_TOKEN", "tok");
        std::env::set_var("VERIFIER_TIMEOUT_SECS", "3");
        let cfg = VerifierConfig::from_env().unwrap().unwrap();
        assert_eq!(cfg.endpoint.as_str(), "https://verifier.example/v1/verify");
        assert_eq!(cfg.api_token.as_deref().map(String::as_str), Some("tok"));
        assert_eq!(cfg.timeout_secs, 3);

        std::env::set_var("VERIFIER_TIMEOUT_SECS", "0");
        assert!(matches!(
            VerifierConfig::from_env(),
            Err(ConfigError::InvalidTimeout(_))
        ));

        std::env::remove_var("VERIFIER_URL");
        std::env::remove_var("VERIFIER_API_TOKEN");
        std::env::remove_var("VERIFIER_TIMEOUT_SECS");
    }
}
