//! Verifier client error types.

/// Failures worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransientVerifierError {
    /// Connection refused, reset, DNS failure and the like.
    #[error("verifier transport error: {0}")]
    Transport(String),
    /// No response within the configured timeout.
    #[error("verifier did not respond within {0} ms")]
    Timeout(u64),
    /// A retryable status (408, 429, 5xx) or one the client does not know.
    #[error("verifier returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

/// Definitive verifier rejections. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TerminalVerifierError {
    /// A non-retryable 4xx.
    #[error("verifier rejected proof with {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// A 2xx whose body reports the proof as not verified.
    #[error("verifier reported proof as not verified: {0}")]
    NotVerified(String),
}

/// Errors building a [`crate::VerifierClient`].
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
