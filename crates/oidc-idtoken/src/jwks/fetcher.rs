//! Discovery + key-set fetching
//!
//! Two documents are retrieved per issuer:
//!
//! 1. `{issuer}/.well-known/openid-configuration` (OpenID Connect Discovery 1.0)
//! 2. the JWK Set named by its `jwks_uri`
//!
//! Any retrieval or parse failure is reported as
//! [`ValidationError::KeyRetrieval`].

use super::retriever::DocumentRetriever;
use crate::error::{Result, ValidationError};
use crate::idtoken_metrics;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// The subset of the OpenID provider metadata used to locate signing keys
///
/// Only `jwks_uri` is required; the document is not otherwise validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    /// Issuer identifier advertised by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// URL of the provider's JWK Set document
    pub jwks_uri: String,

    /// Signing algorithms the provider may use for ID tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,

    /// Remaining metadata, kept as-is
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

/// Public keys published by one issuer, looked up by `kid`
///
/// A key set is fetched wholesale and replaced wholesale on refresh.
#[derive(Clone)]
pub struct KeySet {
    issuer: String,
    jwks_uri: String,
    keys: JwkSet,
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kids: Vec<_> = self
            .keys
            .keys
            .iter()
            .map(|k| k.common.key_id.as_deref().unwrap_or("<none>"))
            .collect();
        f.debug_struct("KeySet")
            .field("issuer", &self.issuer)
            .field("jwks_uri", &self.jwks_uri)
            .field("kids", &kids)
            .finish()
    }
}

impl KeySet {
    /// Wrap a parsed JWK Set
    pub fn new(issuer: impl Into<String>, jwks_uri: impl Into<String>, keys: JwkSet) -> Self {
        Self {
            issuer: issuer.into(),
            jwks_uri: jwks_uri.into(),
            keys,
        }
    }

    /// Find the key whose `kid` equals `kid`
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.find(kid)
    }

    /// Issuer the keys belong to
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Where the keys were fetched from
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// All keys
    pub fn keys(&self) -> &[Jwk] {
        &self.keys.keys
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.keys.len()
    }

    /// Whether the set holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.keys.is_empty()
    }
}

/// Retrieves an issuer's key set through a [`DocumentRetriever`]
#[derive(Clone)]
pub struct KeySetFetcher {
    retriever: Arc<dyn DocumentRetriever>,
}

impl fmt::Debug for KeySetFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySetFetcher").finish_non_exhaustive()
    }
}

impl KeySetFetcher {
    /// Create a fetcher over the given retrieval capability
    pub fn new(retriever: Arc<dyn DocumentRetriever>) -> Self {
        Self { retriever }
    }

    /// Build the discovery URL for an issuer
    ///
    /// A trailing slash on the issuer is not doubled:
    /// `https://idp.example/` → `https://idp.example/.well-known/openid-configuration`.
    pub fn discovery_url(issuer: &str) -> String {
        format!("{}{}", issuer.trim_end_matches('/'), DISCOVERY_PATH)
    }

    /// Fetch the discovery document, then the key set it references
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::KeyRetrieval`] if either document cannot be
    /// retrieved or parsed, or if `jwks_uri` is not an absolute URL.
    pub async fn get_for_issuer(&self, issuer: &str) -> Result<KeySet> {
        let result = self.fetch(issuer).await;
        idtoken_metrics::record_key_set_fetch(result.is_ok());
        result
    }

    async fn fetch(&self, issuer: &str) -> Result<KeySet> {
        let discovery_url = Self::discovery_url(issuer);
        debug!(issuer = %issuer, discovery_url = %discovery_url, "fetching OpenID configuration");

        let body = self.retriever.get(&discovery_url).await.map_err(|e| {
            warn!(issuer = %issuer, error = %e, "failed to retrieve OpenID configuration");
            ValidationError::key_retrieval(e.to_string())
        })?;

        let configuration: OpenIdConfiguration = serde_json::from_str(&body).map_err(|e| {
            warn!(issuer = %issuer, error = %e, "invalid OpenID configuration document");
            ValidationError::key_retrieval(format!(
                "invalid OpenID configuration at {discovery_url}: {e}"
            ))
        })?;

        let jwks_uri = url::Url::parse(&configuration.jwks_uri).map_err(|e| {
            ValidationError::key_retrieval(format!(
                "invalid jwks_uri \"{}\" in OpenID configuration: {e}",
                configuration.jwks_uri
            ))
        })?;

        let body = self.retriever.get(jwks_uri.as_str()).await.map_err(|e| {
            warn!(issuer = %issuer, jwks_uri = %jwks_uri, error = %e, "failed to retrieve key set");
            ValidationError::key_retrieval(e.to_string())
        })?;

        let keys: JwkSet = serde_json::from_str(&body).map_err(|e| {
            warn!(issuer = %issuer, jwks_uri = %jwks_uri, error = %e, "invalid key set document");
            ValidationError::key_retrieval(format!("invalid key set at {jwks_uri}: {e}"))
        })?;

        info!(
            issuer = %issuer,
            jwks_uri = %jwks_uri,
            key_count = keys.keys.len(),
            "fetched key set"
        );

        Ok(KeySet::new(issuer, jwks_uri.as_str(), keys))
    }
}
