//! Decoded token view and raw header inspection

use crate::error::{Result, ValidationError};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

pub(crate) const UNDECODABLE: &str = "ID token could not be decoded.";

/// JOSE header fields inspected before any signature work
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawHeader {
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
}

impl RawHeader {
    /// Split a compact JWT and parse its header
    ///
    /// Only the shape is checked here: three non-empty-header segments and a
    /// JSON header. Payload and signature are left to the verifier.
    pub fn parse(token: &str) -> Result<Self> {
        let mut segments = token.split('.');
        let (Some(header), Some(_), Some(_), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            debug!("token is not three dot-separated segments");
            return Err(ValidationError::decode(UNDECODABLE));
        };

        let bytes = URL_SAFE_NO_PAD.decode(header).map_err(|e| {
            debug!(error = %e, "token header is not base64url");
            ValidationError::decode(UNDECODABLE)
        })?;

        serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "token header is not a JSON object");
            ValidationError::decode(UNDECODABLE)
        })
    }
}

/// A signature-verified ID token
///
/// Claim accessors are lenient: a claim with the wrong JSON type reads as
/// absent, so the claim validator reports it by name.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    algorithm: String,
    key_id: Option<String>,
    claims: Map<String, Value>,
}

impl DecodedToken {
    pub(crate) fn new(algorithm: String, key_id: Option<String>, claims: Map<String, Value>) -> Self {
        Self {
            algorithm,
            key_id,
            claims,
        }
    }

    /// Header `alg`
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Header `kid`
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// `iss`
    pub fn issuer(&self) -> Option<&str> {
        self.string_claim("iss")
    }

    /// `sub`
    pub fn subject(&self) -> Option<&str> {
        self.string_claim("sub")
    }

    /// `aud`, as a de-duplicated list in token order
    ///
    /// A single string becomes a one-element list; non-string array members
    /// are skipped.
    pub fn audiences(&self) -> Vec<&str> {
        let mut audiences: Vec<&str> = Vec::new();
        match self.claims.get("aud") {
            Some(Value::String(aud)) => audiences.push(aud),
            Some(Value::Array(values)) => {
                for aud in values.iter().filter_map(Value::as_str) {
                    if !audiences.contains(&aud) {
                        audiences.push(aud);
                    }
                }
            }
            _ => {}
        }
        audiences
    }

    /// `exp` in epoch seconds
    pub fn expiration(&self) -> Option<i64> {
        self.numeric_claim("exp")
    }

    /// `iat` in epoch seconds
    pub fn issued_at(&self) -> Option<i64> {
        self.numeric_claim("iat")
    }

    /// `nonce`
    pub fn nonce(&self) -> Option<&str> {
        self.string_claim("nonce")
    }

    /// `azp`
    pub fn authorized_party(&self) -> Option<&str> {
        self.string_claim("azp")
    }

    /// `auth_time` in epoch seconds
    pub fn auth_time(&self) -> Option<i64> {
        self.numeric_claim("auth_time")
    }

    /// Any claim by name
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// A string claim by name
    pub fn string_claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }

    /// A numeric claim by name, truncated to whole seconds
    pub fn numeric_claim(&self, name: &str) -> Option<i64> {
        let value = self.claims.get(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
    }

    /// The full claim set
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }
}
