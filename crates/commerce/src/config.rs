//! Commerce client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `REVLINE_API_BASE_URL` - Base URL of the Revline REST backend
//!
//! ## Optional
//! - `REVLINE_STORAGE_DIR` - Directory for persisted client state
//!   (default: `.revline`)
//! - `REVLINE_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 30)
//! - `REVLINE_CHECKOUT_LATENCY_MS` - Simulated checkout latency
//!   (default: 1500)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_STORAGE_DIR: &str = ".revline";
const DEFAULT_REQUEST_TIMEOUT_SECS: &str = "30";
const DEFAULT_CHECKOUT_LATENCY_MS: &str = "1500";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Commerce client configuration.
#[derive(Debug, Clone)]
pub struct CommerceConfig {
    /// Base URL of the backend REST API (no trailing slash required)
    pub api_base_url: String,
    /// Directory holding persisted client state
    pub storage_dir: PathBuf,
    /// Timeout applied to every backend request
    pub request_timeout: Duration,
    /// Simulated latency of the local checkout flow
    pub checkout_latency: Duration,
}

impl CommerceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("REVLINE_API_BASE_URL")?;
        let storage_dir =
            PathBuf::from(get_env_or_default("REVLINE_STORAGE_DIR", DEFAULT_STORAGE_DIR));
        let request_timeout = parse_duration_secs(
            "REVLINE_REQUEST_TIMEOUT_SECS",
            &get_env_or_default("REVLINE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
        )?;
        let checkout_latency = parse_duration_millis(
            "REVLINE_CHECKOUT_LATENCY_MS",
            &get_env_or_default("REVLINE_CHECKOUT_LATENCY_MS", DEFAULT_CHECKOUT_LATENCY_MS),
        )?;

        Ok(Self {
            api_base_url,
            storage_dir,
            request_timeout,
            checkout_latency,
        })
    }

    /// Build a configuration directly, with defaults for the tunables.
    ///
    /// Used by embedders and tests that already know their backend URL and
    /// storage location.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            storage_dir: storage_dir.into(),
            request_timeout: Duration::from_secs(30),
            checkout_latency: Duration::from_millis(1500),
        }
    }

    /// Override the simulated checkout latency.
    #[must_use]
    pub const fn with_checkout_latency(mut self, latency: Duration) -> Self {
        self.checkout_latency = latency;
        self
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a whole-seconds duration value.
fn parse_duration_secs(var_name: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))
}

/// Parse a whole-milliseconds duration value.
fn parse_duration_millis(var_name: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_secs_valid() {
        assert_eq!(
            parse_duration_secs("T", "30").unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_parse_duration_secs_invalid() {
        let err = parse_duration_secs("T", "fast").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_duration_millis_valid() {
        assert_eq!(
            parse_duration_millis("T", "1500").unwrap(),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_new_applies_defaults() {
        let config = CommerceConfig::new("http://localhost:4000", "/tmp/state");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.checkout_latency, Duration::from_millis(1500));
    }

    #[test]
    fn test_with_checkout_latency() {
        let config = CommerceConfig::new("http://localhost:4000", "/tmp/state")
            .with_checkout_latency(Duration::ZERO);
        assert_eq!(config.checkout_latency, Duration::ZERO);
    }
}
