//! Validator configuration
//!
//! Everything a token must satisfy travels in [`Requirements`](crate::Requirements)
//! per call. This module only holds the knobs of the key-set subsystem: how
//! long fetched key sets are trusted and how documents are retrieved.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The forced-refresh window must not exceed the normal window
    #[error(
        "key_set_refresh_max_age ({refresh:?}) must not exceed key_set_max_age ({normal:?})"
    )]
    RefreshWindowTooLong {
        /// Configured normal window
        normal: Duration,
        /// Configured forced-refresh window
        refresh: Duration,
    },

    /// A field that must be positive was zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Configuration for [`IdTokenValidator`](crate::IdTokenValidator) and its key-set cache
///
/// # Example
///
/// ```rust
/// use oidc_idtoken::ValidatorConfig;
/// use std::time::Duration;
///
/// let config = ValidatorConfig {
///     key_set_max_age: Duration::from_secs(300),
///     ..ValidatorConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// How long a fetched key set is used before it is fetched again (default: 10 minutes)
    #[serde(default = "default_key_set_max_age")]
    pub key_set_max_age: Duration,

    /// Maximum age of the key set accepted on the retry after a key miss
    /// (default: 5 seconds)
    ///
    /// A key set younger than this is not refetched, so tokens naming unknown
    /// `kid`s cause at most one provider round trip per window.
    #[serde(default = "default_key_set_refresh_max_age")]
    pub key_set_refresh_max_age: Duration,

    /// Timeout for each discovery / key-set request (default: 10 seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Maximum accepted response body size in bytes (default: 64 KiB)
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,

    /// User agent sent with document requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_key_set_max_age() -> Duration {
    Duration::from_secs(600)
}

fn default_key_set_refresh_max_age() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_response_size() -> usize {
    64 * 1024
}

fn default_user_agent() -> String {
    format!("oidc-idtoken/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            key_set_max_age: default_key_set_max_age(),
            key_set_refresh_max_age: default_key_set_refresh_max_age(),
            request_timeout: default_request_timeout(),
            max_response_size: default_max_response_size(),
            user_agent: default_user_agent(),
        }
    }
}

impl ValidatorConfig {
    /// Check the configuration for inconsistent values
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the refresh window exceeds the normal
    /// window, or when the request timeout or response size limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_set_refresh_max_age > self.key_set_max_age {
            return Err(ConfigError::RefreshWindowTooLong {
                normal: self.key_set_max_age,
                refresh: self.key_set_refresh_max_age,
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Zero("request_timeout"));
        }
        if self.max_response_size == 0 {
            return Err(ConfigError::Zero("max_response_size"));
        }
        Ok(())
    }
}
