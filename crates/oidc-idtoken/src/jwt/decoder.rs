//! Algorithm-pinned signature verification
//!
//! The header algorithm is compared with the pinned one *before* any key is
//! selected, so `none`, a symmetric/asymmetric swap, or any other mismatch is
//! rejected without touching key material.

use super::token::{DecodedToken, RawHeader, UNDECODABLE};
use crate::error::{Result, ValidationError};
use crate::jwks::KeySet;
use crate::requirements::SignatureAlgorithm;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Signature verifier, one variant per supported algorithm
///
/// Adding an algorithm means adding a variant; every `match` on this type is
/// exhaustive.
#[derive(Debug, Clone, Copy)]
pub enum SignedDecoder<'a> {
    /// HS256 with the client secret as the HMAC key
    Symmetric(&'a SecretString),
    /// RS256 with a key selected from the issuer's key set by `kid`
    Asymmetric(&'a KeySet),
}

impl SignedDecoder<'_> {
    /// The only algorithm this decoder accepts
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Symmetric(_) => SignatureAlgorithm::HS256,
            Self::Asymmetric(_) => SignatureAlgorithm::RS256,
        }
    }

    /// Verify the token's signature and return its claims
    ///
    /// No claim is inspected here; `exp`, `aud` and the rest are left to the
    /// claim validator.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::Decode`] if the token is not a compact JWT
    /// - [`ValidationError::UnsupportedAlgorithm`] if the header `alg` differs
    ///   from [`algorithm`](Self::algorithm)
    /// - [`ValidationError::KeyNotFound`] (asymmetric only) if no key matches `kid`
    /// - [`ValidationError::InvalidSignature`] if verification fails
    /// - [`ValidationError::KeyRetrieval`] if the matching JWK is unusable
    pub fn decode(&self, token: &str) -> Result<DecodedToken> {
        let header = RawHeader::parse(token)?;
        let expected = self.algorithm();

        if header.alg.as_deref() != Some(expected.as_str()) {
            let found = header.alg.unwrap_or_default();
            warn!(expected = %expected, found = %found, "ID token algorithm mismatch");
            return Err(ValidationError::UnsupportedAlgorithm {
                expected: expected.as_str().to_string(),
                found,
            });
        }

        let key = self.decoding_key(header.kid.as_deref())?;

        let mut validation = Validation::new(expected.jose());
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let data = decode::<Map<String, Value>>(token, &key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    warn!(algorithm = %expected, kid = ?header.kid, "ID token signature rejected");
                    ValidationError::InvalidSignature
                }
                ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                    ValidationError::key_retrieval(format!("unusable signing key: {e}"))
                }
                _ => {
                    debug!(error = %e, "ID token payload could not be decoded");
                    ValidationError::decode(UNDECODABLE)
                }
            }
        })?;

        Ok(DecodedToken::new(
            expected.as_str().to_string(),
            header.kid,
            data.claims,
        ))
    }

    fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        match self {
            Self::Symmetric(secret) => Ok(DecodingKey::from_secret(
                secret.expose_secret().as_bytes(),
            )),
            Self::Asymmetric(key_set) => {
                let Some(kid) = kid else {
                    debug!(issuer = %key_set.issuer(), "ID token header has no kid");
                    return Err(ValidationError::KeyNotFound { kid: None });
                };

                let jwk = key_set.find(kid).ok_or_else(|| {
                    debug!(issuer = %key_set.issuer(), kid = %kid, "kid not in key set");
                    ValidationError::KeyNotFound {
                        kid: Some(kid.to_string()),
                    }
                })?;

                DecodingKey::from_jwk(jwk).map_err(|e| {
                    warn!(issuer = %key_set.issuer(), kid = %kid, error = %e, "unusable JWK");
                    ValidationError::key_retrieval(format!("unusable signing key \"{kid}\": {e}"))
                })
            }
        }
    }
}
