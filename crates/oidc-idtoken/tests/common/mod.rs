//! Common test utilities for integration tests
//!
//! A wiremock-backed OpenID provider serving discovery and JWKS documents,
//! plus token minting with the RSA fixtures in `tests/fixtures`.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use oidc_idtoken::{
    HttpDocumentRetriever, IdTokenValidator, Requirements, SignatureAlgorithm, ValidatorConfig,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const RSA_A_PEM: &str = include_str!("../fixtures/rsa_a.pem");
pub const RSA_B_PEM: &str = include_str!("../fixtures/rsa_b.pem");
pub const JWK_A: &str = include_str!("../fixtures/jwk_a.json");
pub const JWK_B: &str = include_str!("../fixtures/jwk_b.json");

pub const AUDIENCE: &str = "app-123";
pub const SECRET: &str = "client-secret-that-is-long-enough-for-hs256";

/// Fixed validation time used by every suite
pub const NOW: i64 = 1_700_000_000;

pub fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(NOW, 0).unwrap()
}

/// Mock OpenID provider
pub struct MockProvider {
    pub server: MockServer,
    /// Issuer identifier, with a trailing slash
    pub issuer: String,
}

impl MockProvider {
    /// Start a provider publishing the given JWKs
    pub async fn start(jwks: &[&str]) -> Self {
        Self::start_with_delay(jwks, Duration::ZERO).await
    }

    /// Start a provider whose discovery endpoint answers after `delay`
    pub async fn start_with_delay(jwks: &[&str], delay: Duration) -> Self {
        let server = MockServer::start().await;
        let issuer = format!("{}/", server.uri());

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "issuer": issuer,
                        "jwks_uri": format!("{}/jwks", server.uri()),
                        "id_token_signing_alg_values_supported": ["RS256", "HS256"],
                    }))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;

        let provider = Self { server, issuer };
        provider.publish(jwks, 5).await;
        provider
    }

    /// Start a provider whose discovery endpoint always fails with `status`
    pub async fn start_failing(status: u16) -> Self {
        let server = MockServer::start().await;
        let issuer = format!("{}/", server.uri());

        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        Self { server, issuer }
    }

    /// Replace the published key set
    ///
    /// The new mock takes precedence over the one mounted at start.
    pub async fn rotate(&self, jwks: &[&str]) {
        self.publish(jwks, 1).await;
    }

    async fn publish(&self, jwks: &[&str], priority: u8) {
        let keys: Vec<Value> = jwks
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect();

        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .with_priority(priority)
            .mount(&self.server)
            .await;
    }

    /// Number of requests received for `request_path`
    pub async fn requests_to(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }

    pub async fn discovery_requests(&self) -> usize {
        self.requests_to("/.well-known/openid-configuration").await
    }

    pub async fn jwks_requests(&self) -> usize {
        self.requests_to("/jwks").await
    }

    /// Claims satisfying the default requirements at [`NOW`]
    pub fn claims(&self) -> Value {
        json!({
            "iss": self.issuer,
            "sub": "auth0|123456",
            "aud": AUDIENCE,
            "exp": NOW + 3600,
            "iat": NOW - 30,
        })
    }

    pub fn requirements(&self, algorithm: SignatureAlgorithm) -> Requirements {
        Requirements::builder(algorithm, self.issuer.as_str(), AUDIENCE)
            .build()
            .unwrap()
    }

    /// A validator fetching from this provider over HTTP
    pub fn validator(&self) -> IdTokenValidator {
        validator_with(ValidatorConfig::default())
    }
}

pub fn validator_with(config: ValidatorConfig) -> IdTokenValidator {
    let retriever = HttpDocumentRetriever::new(&config).unwrap();
    IdTokenValidator::new(config, Arc::new(retriever))
}

pub fn sign_rs256(kid: Option<&str>, pem: &str, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
    )
    .unwrap()
}

pub fn sign_hs256(secret: &str, claims: &Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
