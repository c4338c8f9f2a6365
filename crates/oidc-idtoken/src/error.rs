//! Error types for ID token validation
//!
//! Every failure surfaces as a [`ValidationError`]. The `Display` text of each
//! variant is stable: callers and conformance suites compare it verbatim.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ValidationError>;

/// The ways an ID token can be rejected
///
/// `Clone` is required because a single key-set fetch failure is fanned out to
/// every caller waiting on the same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The token is not a syntactically valid compact JWT
    #[error("{0}")]
    Decode(String),

    /// The header algorithm is not the one the requirements pin
    #[error(
        "Signature algorithm of \"{found}\" is not supported. Expected the ID token to be signed with \"{expected}\"."
    )]
    UnsupportedAlgorithm {
        /// Algorithm demanded by the requirements
        expected: String,
        /// Algorithm named in the token header
        found: String,
    },

    /// The signature did not verify
    #[error("Invalid ID token signature.")]
    InvalidSignature,

    /// No key in the issuer's key set matches the token's `kid`
    #[error("Unable to find a signing key that matches kid \"{}\".", .kid.as_deref().unwrap_or(""))]
    KeyNotFound {
        /// Key id from the token header, if any
        kid: Option<String>,
    },

    /// The signature verified but a protocol claim check failed
    #[error(transparent)]
    Claim(#[from] ClaimValidationError),

    /// The discovery document or key set could not be fetched or parsed
    #[error("Unable to retrieve the signing keys: {0}")]
    KeyRetrieval(String),
}

impl ValidationError {
    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a key retrieval error
    pub fn key_retrieval(message: impl Into<String>) -> Self {
        Self::KeyRetrieval(message.into())
    }

    /// Whether this error is the key miss that allows one forced refresh
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }

    /// The failed claim, when this is a claim validation error
    pub fn claim(&self) -> Option<Claim> {
        match self {
            Self::Claim(e) => Some(e.claim),
            _ => None,
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::UnsupportedAlgorithm { .. } => "unsupported_algorithm",
            Self::InvalidSignature => "invalid_signature",
            Self::KeyNotFound { .. } => "key_not_found",
            Self::Claim(_) => "claim",
            Self::KeyRetrieval(_) => "key_retrieval",
        }
    }
}

/// Claims checked by the claim validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Claim {
    /// `iss`
    Iss,
    /// `sub`
    Sub,
    /// `aud`
    Aud,
    /// `exp`
    Exp,
    /// `iat`
    Iat,
    /// `nonce`
    Nonce,
    /// `azp`
    Azp,
    /// `auth_time`
    AuthTime,
    /// `org_id`
    OrgId,
    /// `org_name`
    OrgName,
}

impl Claim {
    /// The registered claim name
    pub fn name(self) -> &'static str {
        match self {
            Self::Iss => "iss",
            Self::Sub => "sub",
            Self::Aud => "aud",
            Self::Exp => "exp",
            Self::Iat => "iat",
            Self::Nonce => "nonce",
            Self::Azp => "azp",
            Self::AuthTime => "auth_time",
            Self::OrgId => "org_id",
            Self::OrgName => "org_name",
        }
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single failed claim check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClaimValidationError {
    /// Which claim failed
    pub claim: Claim,
    /// Human-readable message naming the claim and the offending values
    pub message: String,
}

impl ClaimValidationError {
    pub(crate) fn new(claim: Claim, message: impl Into<String>) -> Self {
        Self {
            claim,
            message: message.into(),
        }
    }
}
