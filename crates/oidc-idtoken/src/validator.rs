//! ID token validation pipeline
//!
//! [`IdTokenValidator::assert`] verifies the signature with the algorithm the
//! caller pinned in [`Requirements`], then checks the claims:
//!
//! ```text
//! Pending ──decode──► Verified ──claims──► Ok(DecodedToken)
//!    │                   │
//!    │ KeyNotFound       └──► Rejected (claim error)
//!    ▼
//! Refetched (short window) ──decode──► Verified | Rejected
//! ```
//!
//! For RS256 the issuer's key set comes from the shared [`KeySetCache`]. A
//! token whose `kid` is not in the cached set triggers at most one forced
//! refresh, and only when the cached set is older than
//! [`ValidatorConfig::key_set_refresh_max_age`]; a second miss is reported to
//! the caller.

use crate::claims::ClaimValidator;
use crate::config::{ConfigError, ValidatorConfig};
use crate::error::{Result, ValidationError};
use crate::idtoken_metrics;
use crate::jwks::{DocumentRetriever, HttpDocumentRetriever, KeySetCache, RetrievalError};
use crate::jwt::{DecodedToken, SignedDecoder};
use crate::requirements::{Requirements, SignatureAlgorithm};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const MISSING_TOKEN: &str = "ID token is required but missing.";
const MISSING_SECRET: &str =
    "A client secret is required to verify an HS256 ID token but none was provided.";

/// Errors building an [`IdTokenValidator`] from configuration alone
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The configuration is inconsistent
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP client could not be created
    #[error(transparent)]
    Retriever(#[from] RetrievalError),
}

/// Key-set lookup windows for one RS256 validation
///
/// The first attempt uses the normal window. A key miss allows one more
/// attempt with the forced-refresh window; after that, misses are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMissRetry {
    attempts: u32,
    refresh_max_age: Duration,
}

impl KeyMissRetry {
    /// Total key-set lookups per validation, the first one included
    pub const MAX_ATTEMPTS: u32 = 2;

    /// Start a policy; the first attempt is counted immediately
    pub fn new(refresh_max_age: Duration) -> Self {
        Self {
            attempts: 1,
            refresh_max_age,
        }
    }

    /// Lookups made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a key miss and return the window for the retry, if one is left
    pub fn on_key_miss(&mut self) -> Option<Duration> {
        if self.attempts >= Self::MAX_ATTEMPTS {
            return None;
        }
        self.attempts += 1;
        Some(self.refresh_max_age)
    }
}

/// Validates OpenID Connect ID tokens
///
/// Cheap to share behind an `Arc`; several validators may also share one
/// [`KeySetCache`] through [`with_cache`](Self::with_cache).
///
/// # Example
///
/// ```rust,no_run
/// use oidc_idtoken::{IdTokenValidator, Requirements, SignatureAlgorithm, ValidatorConfig};
///
/// # tokio_test::block_on(async {
/// let validator = IdTokenValidator::from_config(ValidatorConfig::default())?;
/// let requirements = Requirements::builder(
///     SignatureAlgorithm::RS256,
///     "https://tenant.example.com/",
///     "my-client-id",
/// )
/// .nonce("n-0S6_WzA2Mj")
/// .build()?;
///
/// let token = validator.assert_now(&requirements, "eyJhbGciOi...", None).await?;
/// println!("authenticated {:?}", token.subject());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct IdTokenValidator {
    config: ValidatorConfig,
    key_sets: Arc<KeySetCache>,
}

impl IdTokenValidator {
    /// Create a validator with its own key-set cache over `retriever`
    pub fn new(config: ValidatorConfig, retriever: Arc<dyn DocumentRetriever>) -> Self {
        Self::with_cache(config, Arc::new(KeySetCache::from_retriever(retriever)))
    }

    /// Create a validator sharing an existing key-set cache
    pub fn with_cache(config: ValidatorConfig, key_sets: Arc<KeySetCache>) -> Self {
        Self { config, key_sets }
    }

    /// Create a validator fetching documents over HTTP
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: ValidatorConfig) -> std::result::Result<Self, BuildError> {
        config.validate()?;
        let retriever = HttpDocumentRetriever::new(&config)?;
        Ok(Self::new(config, Arc::new(retriever)))
    }

    /// Configuration in use
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// The key-set cache
    pub fn key_sets(&self) -> &Arc<KeySetCache> {
        &self.key_sets
    }

    /// Validate `token` against `requirements` at time `now`
    ///
    /// `client_secret` is the HMAC key for HS256 and is ignored for RS256.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::Decode`] if the token is blank or malformed, or an
    ///   HS256 token is validated without a secret or with a blank one
    /// - [`ValidationError::UnsupportedAlgorithm`] if the token is not signed
    ///   with the required algorithm
    /// - [`ValidationError::KeyRetrieval`] if the issuer's keys cannot be fetched
    /// - [`ValidationError::KeyNotFound`] if no key matches, even after a refresh
    /// - [`ValidationError::InvalidSignature`] if verification fails
    /// - [`ValidationError::Claim`] for the first failing claim check
    pub async fn assert(
        &self,
        requirements: &Requirements,
        token: &str,
        client_secret: Option<&SecretString>,
        now: DateTime<Utc>,
    ) -> Result<DecodedToken> {
        let start = Instant::now();
        let algorithm = requirements.signature_algorithm();

        let result = self.verify(requirements, token, client_secret, now).await;

        idtoken_metrics::record_validation_duration(start.elapsed().as_secs_f64());
        match &result {
            Ok(decoded) => {
                idtoken_metrics::record_validation(algorithm.as_str(), "success");
                debug!(
                    issuer = %requirements.issuer(),
                    algorithm = %algorithm,
                    kid = ?decoded.key_id(),
                    subject = ?decoded.subject(),
                    "ID token validated"
                );
            }
            Err(e) => {
                idtoken_metrics::record_validation(algorithm.as_str(), e.kind());
                debug!(
                    issuer = %requirements.issuer(),
                    algorithm = %algorithm,
                    error = %e,
                    "ID token rejected"
                );
            }
        }
        result
    }

    /// [`assert`](Self::assert) at the current system time
    ///
    /// # Errors
    ///
    /// As for [`assert`](Self::assert).
    pub async fn assert_now(
        &self,
        requirements: &Requirements,
        token: &str,
        client_secret: Option<&SecretString>,
    ) -> Result<DecodedToken> {
        self.assert(requirements, token, client_secret, Utc::now())
            .await
    }

    async fn verify(
        &self,
        requirements: &Requirements,
        token: &str,
        client_secret: Option<&SecretString>,
        now: DateTime<Utc>,
    ) -> Result<DecodedToken> {
        if token.trim().is_empty() {
            return Err(ValidationError::decode(MISSING_TOKEN));
        }

        let decoded = match requirements.signature_algorithm() {
            SignatureAlgorithm::HS256 => {
                let secret = client_secret
                    .filter(|secret| !secret.expose_secret().trim().is_empty())
                    .ok_or_else(|| ValidationError::decode(MISSING_SECRET))?;
                SignedDecoder::Symmetric(secret).decode(token)?
            }
            SignatureAlgorithm::RS256 => self.decode_asymmetric(requirements.issuer(), token).await?,
        };

        ClaimValidator::assert(requirements, &decoded, now)?;
        Ok(decoded)
    }

    async fn decode_asymmetric(&self, issuer: &str, token: &str) -> Result<DecodedToken> {
        let mut retry = KeyMissRetry::new(self.config.key_set_refresh_max_age);
        let mut max_age = self.config.key_set_max_age;

        loop {
            let key_set = self.key_sets.get(issuer, max_age).await?;
            match SignedDecoder::Asymmetric(&key_set).decode(token) {
                Err(e) if e.is_key_not_found() => {
                    let Some(refresh_max_age) = retry.on_key_miss() else {
                        warn!(issuer = %issuer, error = %e, "signing key still missing after refresh");
                        return Err(e);
                    };
                    warn!(
                        issuer = %issuer,
                        error = %e,
                        attempt = retry.attempts(),
                        "signing key not in cached key set, refreshing"
                    );
                    max_age = refresh_max_age;
                }
                other => return other,
            }
        }
    }
}
