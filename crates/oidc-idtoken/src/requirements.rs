//! What a valid ID token must satisfy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default clock-skew tolerance applied to `exp` and `auth_time`
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(60);

/// Signature algorithms accepted for ID tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256 keyed with the client secret
    HS256,
    /// RSASSA-PKCS1-v1_5 SHA-256 with the issuer's published keys
    RS256,
}

impl SignatureAlgorithm {
    /// The JOSE `alg` value
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::RS256 => "RS256",
        }
    }

    pub(crate) fn jose(self) -> jsonwebtoken::Algorithm {
        match self {
            Self::HS256 => jsonwebtoken::Algorithm::HS256,
            Self::RS256 => jsonwebtoken::Algorithm::RS256,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid [`Requirements`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementsError {
    /// A mandatory field was empty or whitespace
    #[error("{0} is required and must not be blank")]
    Blank(&'static str),
}

/// Immutable description of what a valid ID token must satisfy
///
/// Build one per validation call with [`Requirements::builder`].
///
/// # Example
///
/// ```rust
/// use oidc_idtoken::{Requirements, SignatureAlgorithm};
/// use std::time::Duration;
///
/// let requirements = Requirements::builder(
///     SignatureAlgorithm::RS256,
///     "https://idp.example/",
///     "app-123",
/// )
/// .nonce("n-0S6_WzA2Mj")
/// .max_age(Duration::from_secs(3600))
/// .build()?;
///
/// assert_eq!(requirements.audience(), "app-123");
/// # Ok::<(), oidc_idtoken::RequirementsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    signature_algorithm: SignatureAlgorithm,
    issuer: String,
    audience: String,
    nonce: Option<String>,
    max_age: Option<Duration>,
    leeway: Duration,
    organization: Option<String>,
}

impl Requirements {
    /// Start building requirements; leeway defaults to [`DEFAULT_LEEWAY`]
    pub fn builder(
        signature_algorithm: SignatureAlgorithm,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> RequirementsBuilder {
        RequirementsBuilder {
            signature_algorithm,
            issuer: issuer.into(),
            audience: audience.into(),
            nonce: None,
            max_age: None,
            leeway: DEFAULT_LEEWAY,
            organization: None,
        }
    }

    /// Algorithm the token must be signed with
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    /// Expected `iss`
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Expected member of `aud` (and `azp` when `aud` has several values)
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Expected `nonce`, if the authentication request sent one
    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    /// Maximum time since end-user authentication, if requested
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Clock-skew tolerance
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Expected organization id (`org_...`) or name
    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }
}

/// Builder for [`Requirements`]
#[derive(Debug, Clone)]
#[must_use]
pub struct RequirementsBuilder {
    signature_algorithm: SignatureAlgorithm,
    issuer: String,
    audience: String,
    nonce: Option<String>,
    max_age: Option<Duration>,
    leeway: Duration,
    organization: Option<String>,
}

impl RequirementsBuilder {
    /// Require this `nonce`
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Require `auth_time` within `max_age` of now
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Set the clock-skew tolerance
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Require this organization (`org_` prefix → `org_id`, otherwise `org_name`)
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Finish building
    ///
    /// Optional string fields that are blank are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementsError::Blank`] when the issuer or audience is blank.
    pub fn build(self) -> Result<Requirements, RequirementsError> {
        if self.issuer.trim().is_empty() {
            return Err(RequirementsError::Blank("issuer"));
        }
        if self.audience.trim().is_empty() {
            return Err(RequirementsError::Blank("audience"));
        }

        Ok(Requirements {
            signature_algorithm: self.signature_algorithm,
            issuer: self.issuer,
            audience: self.audience,
            nonce: self.nonce.filter(|n| !n.trim().is_empty()),
            max_age: self.max_age,
            leeway: self.leeway,
            organization: self.organization.filter(|o| !o.trim().is_empty()),
        })
    }
}
