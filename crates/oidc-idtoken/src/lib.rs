//! # oidc-idtoken - OpenID Connect ID Token Validation
//!
//! Verifies ID tokens returned by an OpenID Connect provider and checks their
//! claims against what the relying party requested.
//!
//! ## Key Features
//!
//! - **Pinned algorithms** - HS256 with the client secret or RS256 with the
//!   issuer's published keys; `none` and algorithm swaps are rejected before any
//!   key is used
//! - **Cached key sets** - per-issuer discovery + JWKS fetches shared by all
//!   concurrent callers, refreshed once when a token names an unknown `kid`
//! - **Protocol claim checks** - `iss`, `sub`, `aud`, `exp`, `iat`, `nonce`,
//!   `azp`, `auth_time` and organization, with stable error messages
//! - **Pluggable transport** - documents are fetched through [`DocumentRetriever`];
//!   [`HttpDocumentRetriever`] is the `reqwest` default
//!
//! ## Architecture
//!
//! - [`validator`] - [`IdTokenValidator`], the decode → verify → check pipeline
//! - [`jwt`] - algorithm-pinned signature verification and the decoded claim view
//! - [`claims`] - the ordered claim checks
//! - [`jwks`] - discovery, key-set fetching and the per-issuer key-set cache
//! - [`cache`] - the single-flight [`AsyncAgedCache`] behind the key-set cache
//! - [`requirements`] - per-call [`Requirements`]
//! - [`config`] - [`ValidatorConfig`]
//! - [`error`] - [`ValidationError`] and [`ClaimValidationError`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oidc_idtoken::{IdTokenValidator, Requirements, SignatureAlgorithm, ValidatorConfig};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let validator = IdTokenValidator::from_config(ValidatorConfig::default())?;
//!
//! let requirements = Requirements::builder(
//!     SignatureAlgorithm::RS256,
//!     "https://tenant.example.com/",
//!     "my-client-id",
//! )
//! .nonce("n-0S6_WzA2Mj")
//! .max_age(Duration::from_secs(3600))
//! .build()?;
//!
//! match validator.assert_now(&requirements, "eyJhbGciOi...", None).await {
//!     Ok(token) => println!("signed in: {:?}", token.subject()),
//!     Err(e) => eprintln!("rejected: {e}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```
//!
//! ## Feature Flags
//!
//! - `metrics` - validation and key-set fetch counters via the `metrics` crate

pub mod cache;
pub mod claims;
pub mod config;
pub mod error;
pub mod idtoken_metrics;
pub mod jwks;
pub mod jwt;
pub mod requirements;
pub mod validator;

#[cfg(test)]
mod test_support;

#[doc(inline)]
pub use cache::AsyncAgedCache;
#[doc(inline)]
pub use claims::ClaimValidator;
#[doc(inline)]
pub use config::{ConfigError, ValidatorConfig};
#[doc(inline)]
pub use error::{Claim, ClaimValidationError, Result, ValidationError};
#[doc(inline)]
pub use jwks::{
    DocumentRetriever, HttpDocumentRetriever, KeySet, KeySetCache, KeySetFetcher,
    OpenIdConfiguration, RetrievalError,
};
#[doc(inline)]
pub use jwt::{DecodedToken, SignedDecoder};
#[doc(inline)]
pub use requirements::{
    DEFAULT_LEEWAY, Requirements, RequirementsBuilder, RequirementsError, SignatureAlgorithm,
};
#[doc(inline)]
pub use validator::{BuildError, IdTokenValidator, KeyMissRetry};

#[cfg(feature = "metrics")]
pub use idtoken_metrics::init_idtoken_metrics;
