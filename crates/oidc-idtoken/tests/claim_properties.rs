//! Property tests for the claim checks
//!
//! Tokens are HS256-signed and decoded with the symmetric decoder, so no
//! network is involved.

mod common;

use chrono::{TimeZone, Utc};
use common::{AUDIENCE, SECRET, sign_hs256};
use oidc_idtoken::{
    Claim, ClaimValidationError, ClaimValidator, DecodedToken, Requirements, SignatureAlgorithm,
    SignedDecoder,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::time::Duration;

const ISSUER: &str = "https://idp.example/";
const NOW: i64 = 1_700_000_000;

fn decode(claims: &Value) -> DecodedToken {
    let secret = SecretString::new(SECRET.to_string());
    SignedDecoder::Symmetric(&secret)
        .decode(&sign_hs256(SECRET, claims))
        .unwrap()
}

fn base_claims() -> Value {
    json!({
        "iss": ISSUER,
        "sub": "user-1",
        "aud": AUDIENCE,
        "exp": NOW + 3600,
        "iat": NOW - 1,
        "nonce": "n-1",
        "auth_time": NOW - 10,
        "org_id": "org_123",
    })
}

fn strict_requirements() -> Requirements {
    Requirements::builder(SignatureAlgorithm::HS256, ISSUER, AUDIENCE)
        .nonce("n-1")
        .max_age(Duration::from_secs(3600))
        .organization("org_123")
        .build()
        .unwrap()
}

fn check(
    requirements: &Requirements,
    claims: &Value,
    now: i64,
) -> Result<(), ClaimValidationError> {
    ClaimValidator::assert(
        requirements,
        &decode(claims),
        Utc.timestamp_opt(now, 0).unwrap(),
    )
}

#[test]
fn test_satisfying_token_accepted() {
    assert_eq!(check(&strict_requirements(), &base_claims(), NOW), Ok(()));
}

fn without(name: &str) -> Value {
    let mut claims = base_claims();
    claims.as_object_mut().unwrap().remove(name);
    claims
}

#[test]
fn test_each_failing_check_reports_only_its_claim() {
    let mut multi_audience = base_claims();
    multi_audience["aud"] = json!([AUDIENCE, "another-api"]);

    let by_name = Requirements::builder(SignatureAlgorithm::HS256, ISSUER, AUDIENCE)
        .organization("Acme Corp")
        .build()
        .unwrap();

    let cases = [
        ("iss", without("iss"), strict_requirements(), Claim::Iss),
        ("sub", without("sub"), strict_requirements(), Claim::Sub),
        ("aud", without("aud"), strict_requirements(), Claim::Aud),
        ("exp", without("exp"), strict_requirements(), Claim::Exp),
        ("iat", without("iat"), strict_requirements(), Claim::Iat),
        ("nonce", without("nonce"), strict_requirements(), Claim::Nonce),
        ("azp", multi_audience, strict_requirements(), Claim::Azp),
        ("auth_time", without("auth_time"), strict_requirements(), Claim::AuthTime),
        ("org_id", without("org_id"), strict_requirements(), Claim::OrgId),
        ("org_name", base_claims(), by_name, Claim::OrgName),
    ];

    for (name, claims, requirements, claim) in cases {
        let err = check(&requirements, &claims, NOW).unwrap_err();
        assert_eq!(err.claim, claim, "{name}");
        assert!(err.message.contains(&format!("({name})")), "{}", err.message);
    }
}

#[test]
fn test_max_age_boundary_with_leeway() {
    let requirements = Requirements::builder(SignatureAlgorithm::HS256, ISSUER, AUDIENCE)
        .max_age(Duration::from_secs(100))
        .leeway(Duration::from_secs(60))
        .build()
        .unwrap();

    let at = |elapsed: i64| {
        let mut claims = base_claims();
        claims["auth_time"] = json!(NOW - elapsed);
        check(&requirements, &claims, NOW)
    };

    assert_eq!(at(161).unwrap_err().claim, Claim::AuthTime);
    assert_eq!(at(160), Ok(()));
    assert_eq!(at(159), Ok(()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_expiration_boundary(exp_offset in -600i64..600, leeway in 0u64..300) {
        let requirements = Requirements::builder(SignatureAlgorithm::HS256, ISSUER, AUDIENCE)
            .leeway(Duration::from_secs(leeway))
            .build()
            .unwrap();
        let mut claims = base_claims();
        claims["exp"] = json!(NOW + exp_offset);

        let result = check(&requirements, &claims, NOW);
        let expired = NOW >= NOW + exp_offset + leeway as i64;

        prop_assert_eq!(result.is_err(), expired);
        if let Err(err) = result {
            prop_assert_eq!(err.claim, Claim::Exp);
        }
    }

    #[test]
    fn prop_auth_time_boundary(
        elapsed in 0i64..1000,
        max_age in 0u64..500,
        leeway in 0u64..120,
    ) {
        let requirements = Requirements::builder(SignatureAlgorithm::HS256, ISSUER, AUDIENCE)
            .max_age(Duration::from_secs(max_age))
            .leeway(Duration::from_secs(leeway))
            .build()
            .unwrap();
        let mut claims = base_claims();
        claims["auth_time"] = json!(NOW - elapsed);

        let result = check(&requirements, &claims, NOW);
        let too_old = elapsed > (max_age + leeway) as i64;

        prop_assert_eq!(result.is_err(), too_old);
        if let Err(err) = result {
            prop_assert_eq!(err.claim, Claim::AuthTime);
        }
    }

    #[test]
    fn prop_validation_is_deterministic(now_offset in -7200i64..7200) {
        let requirements = strict_requirements();
        let token = decode(&base_claims());
        let now = Utc.timestamp_opt(NOW + now_offset, 0).unwrap();

        let first = ClaimValidator::assert(&requirements, &token, now);
        let second = ClaimValidator::assert(&requirements, &token, now);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_organization_name_ignores_case(name in "[a-zA-Z][a-zA-Z ]{0,15}") {
        let requirements = Requirements::builder(SignatureAlgorithm::HS256, ISSUER, AUDIENCE)
            .organization(name.to_uppercase())
            .build()
            .unwrap();
        let mut claims = base_claims();
        claims["org_name"] = json!(name.to_lowercase());

        prop_assert_eq!(check(&requirements, &claims, NOW), Ok(()));
    }
}
