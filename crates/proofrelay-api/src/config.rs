//! # Process Configuration
//!
//! [`AppConfig`] is read from the environment once at startup and handed to
//! constructors. Nothing below this crate reads environment variables except
//! the verifier client's own `from_env`, which this module delegates to.
//!
//! Custom `Debug` redacts every secret.

use std::time::Duration;

use zeroize::Zeroizing;

use proofrelay_crypto::SignatureAlgorithm;
use proofrelay_pipeline::{BackoffPolicy, ReconcilerConfig};
use proofrelay_verifier_client::VerifierConfig;

/// Extra time the reconciler grants a verifier call beyond the HTTP timeout.
const ATTEMPT_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`. Anything other than `json` selects text.
    pub fn from_env() -> Self {
        match non_blank_var("LOG_FORMAT") {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Bearer token required on `/v1` routes. `None` disables ingress auth.
    pub auth_token: Option<Zeroizing<String>>,
    /// Ed25519 public key, hex or base64. `None` skips signature checks.
    pub proof_public_key: Option<String>,
    /// Algorithm used for envelope signatures.
    pub signature_algorithm: SignatureAlgorithm,
    /// Refuse to start without `proof_public_key`.
    pub require_signature: bool,
    /// External verifier. `None` disables the reconciler.
    pub verifier: Option<VerifierConfig>,
    /// Reconciler tuning.
    pub reconciler: ReconcilerConfig,
    /// Backoff jitter ratio in `[0, 1]`.
    pub retry_jitter: f64,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<Zeroizing<String>>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("proof_public_key", &self.proof_public_key)
            .field("signature_algorithm", &self.signature_algorithm)
            .field("require_signature", &self.require_signature)
            .field("verifier", &self.verifier)
            .field("reconciler", &self.reconciler)
            .field("retry_jitter", &self.retry_jitter)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            proof_public_key: None,
            signature_algorithm: SignatureAlgorithm::Ed25519,
            require_signature: false,
            verifier: None,
            reconciler: ReconcilerConfig::default(),
            retry_jitter: 0.2,
            database_url: None,
            log_format: LogFormat::Text,
        }
    }
}

/// Errors building [`AppConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{var} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: &'static str,
    },

    /// `SIGNATURE_ALGORITHM` names an unsupported algorithm.
    #[error("unsupported SIGNATURE_ALGORITHM {0:?}; only ed25519 is supported")]
    UnsupportedAlgorithm(String),

    /// `REQUIRE_SIGNATURE` is set without a key.
    #[error("REQUIRE_SIGNATURE is enabled but PROOF_PUBLIC_KEY is not set")]
    SignatureKeyRequired,

    /// The verifier section is invalid.
    #[error(transparent)]
    Verifier(#[from] proofrelay_verifier_client::ConfigError),
}

impl AppConfig {
    /// Build configuration from environment variables.
    ///
    /// Unset or blank variables take their defaults; set but unparsable
    /// variables are errors rather than silently defaulted.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let reconciler_defaults = ReconcilerConfig::default();
        let backoff_defaults = BackoffPolicy::default();

        let signature_algorithm = match non_blank_var("SIGNATURE_ALGORITHM") {
            None => SignatureAlgorithm::default(),
            Some(name) => SignatureAlgorithm::from_name(&name)
                .ok_or(ConfigError::UnsupportedAlgorithm(name))?,
        };
        let proof_public_key = non_blank_var("PROOF_PUBLIC_KEY");
        let require_signature = parse_bool("REQUIRE_SIGNATURE")?.unwrap_or(false);
        if require_signature && proof_public_key.is_none() {
            return Err(ConfigError::SignatureKeyRequired);
        }

        let max_attempts: u32 = parse_positive("RETRY_MAX_ATTEMPTS")?.unwrap_or(backoff_defaults.max_attempts);
        let base_delay = parse_millis("RETRY_BASE_DELAY_MS")?.unwrap_or(backoff_defaults.base_delay);
        let max_delay = parse_millis("RETRY_MAX_DELAY_MS")?.unwrap_or(backoff_defaults.max_delay);
        let multiplier = match parse::<f64>("RETRY_MULTIPLIER")? {
            None => backoff_defaults.multiplier,
            Some((raw, m)) if !m.is_finite() || m < 1.0 => {
                return Err(invalid("RETRY_MULTIPLIER", raw, "must be a number >= 1.0"))
            }
            Some((_, m)) => m,
        };
        let retry_jitter = match parse::<f64>("RETRY_JITTER")? {
            None => defaults.retry_jitter,
            Some((raw, j)) if !(0.0..=1.0).contains(&j) => {
                return Err(invalid("RETRY_JITTER", raw, "must be between 0 and 1"))
            }
            Some((_, j)) => j,
        };

        let verifier = VerifierConfig::from_env()?;
        let attempt_timeout = verifier
            .as_ref()
            .map(|v| Duration::from_secs(v.timeout_secs) + ATTEMPT_TIMEOUT_GRACE)
            .unwrap_or(reconciler_defaults.attempt_timeout);

        let reconciler = ReconcilerConfig {
            backoff: BackoffPolicy {
                max_attempts,
                base_delay,
                multiplier,
                max_delay,
            },
            poll_interval: parse_millis("RECONCILE_INTERVAL_MS")?.unwrap_or(reconciler_defaults.poll_interval),
            batch_size: parse_positive("RECONCILE_BATCH_SIZE")?.unwrap_or(reconciler_defaults.batch_size),
            concurrency: parse_positive("RECONCILE_CONCURRENCY")?.unwrap_or(reconciler_defaults.concurrency),
            attempt_timeout,
        };

        Ok(Self {
            port: parse::<u16>("PORT")?.map(|(_, p)| p).unwrap_or(defaults.port),
            auth_token: non_blank_var("AUTH_TOKEN").map(Zeroizing::new),
            proof_public_key,
            signature_algorithm,
            require_signature,
            verifier,
            reconciler,
            retry_jitter,
            database_url: non_blank_var("DATABASE_URL").map(Zeroizing::new),
            log_format: LogFormat::from_env(),
        })
    }
}

fn non_blank_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

fn invalid(var: &'static str, value: String, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue { var, value, reason }
}

fn parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<(String, T)>, ConfigError> {
    match non_blank_var(var) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => Ok(Some((raw, v))),
            Err(_) => Err(invalid(var, raw, "not a valid number")),
        },
    }
}

fn parse_positive<T>(var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match parse::<T>(var)? {
        None => Ok(None),
        Some((raw, v)) if v <= T::default() => Err(invalid(var, raw, "must be greater than zero")),
        Some((_, v)) => Ok(Some(v)),
    }
}

fn parse_millis(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    Ok(parse_positive::<u64>(var)?.map(Duration::from_millis))
}

fn parse_bool(var: &'static str) -> Result<Option<bool>, ConfigError> {
    match non_blank_var(var) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(invalid(var, raw, "expected true or false")),
        },
    }
}
