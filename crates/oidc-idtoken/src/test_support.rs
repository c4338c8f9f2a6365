//! Token minting helpers for unit tests

use crate::jwks::KeySet;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::Value;

pub(crate) const RSA_A_PEM: &str = include_str!("../tests/fixtures/rsa_a.pem");
pub(crate) const RSA_B_PEM: &str = include_str!("../tests/fixtures/rsa_b.pem");
pub(crate) const JWK_A: &str = include_str!("../tests/fixtures/jwk_a.json");
pub(crate) const JWK_B: &str = include_str!("../tests/fixtures/jwk_b.json");

pub(crate) const ISSUER: &str = "https://idp.example/";
pub(crate) const AUDIENCE: &str = "app-123";
pub(crate) const SECRET: &str = "client-secret-that-is-long-enough-for-hs256";

pub(crate) fn key_set(jwks: &[&str]) -> KeySet {
    let keys = jwks
        .iter()
        .map(|raw| serde_json::from_str::<Jwk>(raw).unwrap())
        .collect();
    KeySet::new(ISSUER, "https://idp.example/.well-known/jwks.json", JwkSet { keys })
}

pub(crate) fn sign_rs256(kid: Option<&str>, pem: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
    )
    .unwrap()
}

pub(crate) fn sign_hs256(secret: &str, claims: &Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Assemble a token from arbitrary header/claims and a literal signature segment
pub(crate) fn unsigned(header: &Value, claims: &Value, signature: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string()),
        signature
    )
}
