//! OpenID Connect ID token claim checks
//!
//! [`ClaimValidator::assert`] runs after the signature has been verified and
//! stops at the first failing check. The order is fixed:
//!
//! 1. `iss` present and equal to the required issuer
//! 2. `sub` present
//! 3. `aud` present and containing the required audience
//! 4. `exp` present and not passed (`now >= exp + leeway` fails)
//! 5. `iat` present
//! 6. `nonce` equal to the required nonce, when one is required
//! 7. `azp` equal to the audience, when `aud` has several values
//! 8. `auth_time` recent enough (`now > auth_time + max_age + leeway` fails),
//!    when a max age is required
//! 9. `org_id` / `org_name` equal to the required organization, when one is required
//!
//! The two time boundaries differ: a token is already expired *at*
//! `exp + leeway`, but an authentication is still acceptable *at*
//! `auth_time + max_age + leeway`.

use crate::error::{Claim, ClaimValidationError};
use crate::jwt::DecodedToken;
use crate::requirements::Requirements;
use chrono::{DateTime, Utc};
use std::time::Duration;

type ClaimResult = Result<(), ClaimValidationError>;

/// Stateless ID token claim validator
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimValidator;

impl ClaimValidator {
    /// Check `token` against `requirements` at time `now`
    ///
    /// # Errors
    ///
    /// Returns the [`ClaimValidationError`] of the first failing check.
    pub fn assert(
        requirements: &Requirements,
        token: &DecodedToken,
        now: DateTime<Utc>,
    ) -> ClaimResult {
        let now = now.timestamp();
        let leeway = seconds(requirements.leeway());

        check_issuer(requirements, token)?;
        check_subject(token)?;
        check_audience(requirements, token)?;
        check_expiration(token, now, leeway)?;
        check_issued_at(token)?;
        check_nonce(requirements, token)?;
        check_authorized_party(requirements, token)?;
        check_auth_time(requirements, token, now, leeway)?;
        check_organization(requirements, token)
    }
}

fn seconds(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_issuer(requirements: &Requirements, token: &DecodedToken) -> ClaimResult {
    let Some(issuer) = non_blank(token.issuer()) else {
        return Err(ClaimValidationError::new(
            Claim::Iss,
            "Issuer (iss) claim must be a string present in the ID token.",
        ));
    };

    if issuer != requirements.issuer() {
        return Err(ClaimValidationError::new(
            Claim::Iss,
            format!(
                "Issuer (iss) claim mismatch in the ID token; expected \"{}\", found \"{}\".",
                requirements.issuer(),
                issuer
            ),
        ));
    }
    Ok(())
}

fn check_subject(token: &DecodedToken) -> ClaimResult {
    if non_blank(token.subject()).is_none() {
        return Err(ClaimValidationError::new(
            Claim::Sub,
            "Subject (sub) claim must be a string present in the ID token.",
        ));
    }
    Ok(())
}

fn check_audience(requirements: &Requirements, token: &DecodedToken) -> ClaimResult {
    let audiences = token.audiences();
    if audiences.is_empty() {
        return Err(ClaimValidationError::new(
            Claim::Aud,
            "Audience (aud) claim must be a string or array of strings present in the ID token.",
        ));
    }

    if !audiences.contains(&requirements.audience()) {
        return Err(ClaimValidationError::new(
            Claim::Aud,
            format!(
                "Audience (aud) claim mismatch in the ID token; expected \"{}\" but was not one of \"{}\".",
                requirements.audience(),
                audiences.join(", ")
            ),
        ));
    }
    Ok(())
}

fn check_expiration(token: &DecodedToken, now: i64, leeway: i64) -> ClaimResult {
    let Some(expiration) = token.expiration() else {
        return Err(ClaimValidationError::new(
            Claim::Exp,
            "Expiration Time (exp) claim must be a number present in the ID token.",
        ));
    };

    let expires_at = expiration.saturating_add(leeway);
    if now >= expires_at {
        return Err(ClaimValidationError::new(
            Claim::Exp,
            format!(
                "Expiration Time (exp) claim error in the ID token; current time ({now}) is after expiration time ({expires_at})."
            ),
        ));
    }
    Ok(())
}

fn check_issued_at(token: &DecodedToken) -> ClaimResult {
    if token.issued_at().is_none() {
        return Err(ClaimValidationError::new(
            Claim::Iat,
            "Issued At (iat) claim must be a number present in the ID token.",
        ));
    }
    Ok(())
}

fn check_nonce(requirements: &Requirements, token: &DecodedToken) -> ClaimResult {
    let Some(expected) = requirements.nonce() else {
        return Ok(());
    };

    let Some(nonce) = non_blank(token.nonce()) else {
        return Err(ClaimValidationError::new(
            Claim::Nonce,
            "Nonce (nonce) claim must be a string present in the ID token.",
        ));
    };

    if nonce != expected {
        return Err(ClaimValidationError::new(
            Claim::Nonce,
            format!(
                "Nonce (nonce) claim mismatch in the ID token; expected \"{expected}\", found \"{nonce}\"."
            ),
        ));
    }
    Ok(())
}

fn check_authorized_party(requirements: &Requirements, token: &DecodedToken) -> ClaimResult {
    if token.audiences().len() <= 1 {
        return Ok(());
    }

    let Some(azp) = non_blank(token.authorized_party()) else {
        return Err(ClaimValidationError::new(
            Claim::Azp,
            "Authorized Party (azp) claim must be a string present in the ID token when Audience (aud) claim has multiple values.",
        ));
    };

    if azp != requirements.audience() {
        return Err(ClaimValidationError::new(
            Claim::Azp,
            format!(
                "Authorized Party (azp) claim mismatch in the ID token; expected \"{}\", found \"{}\".",
                requirements.audience(),
                azp
            ),
        ));
    }
    Ok(())
}

fn check_auth_time(
    requirements: &Requirements,
    token: &DecodedToken,
    now: i64,
    leeway: i64,
) -> ClaimResult {
    let Some(max_age) = requirements.max_age() else {
        return Ok(());
    };

    let Some(auth_time) = token.auth_time() else {
        return Err(ClaimValidationError::new(
            Claim::AuthTime,
            "Authentication Time (auth_time) claim must be a number present in the ID token when Max Age (max_age) is specified.",
        ));
    };

    let valid_until = auth_time
        .saturating_add(seconds(max_age))
        .saturating_add(leeway);
    if now > valid_until {
        return Err(ClaimValidationError::new(
            Claim::AuthTime,
            format!(
                "Authentication Time (auth_time) claim in the ID token indicates that too much time has passed since the last end-user authentication. Current time ({now}) is after last auth at ({valid_until})."
            ),
        ));
    }
    Ok(())
}

fn check_organization(requirements: &Requirements, token: &DecodedToken) -> ClaimResult {
    let Some(expected) = requirements.organization() else {
        return Ok(());
    };

    if expected.starts_with("org_") {
        let Some(org_id) = non_blank(token.string_claim("org_id")) else {
            return Err(ClaimValidationError::new(
                Claim::OrgId,
                "Organization Id (org_id) claim must be a string present in the ID token.",
            ));
        };

        if org_id != expected {
            return Err(ClaimValidationError::new(
                Claim::OrgId,
                format!(
                    "Organization Id (org_id) claim mismatch in the ID token; expected \"{expected}\", found \"{org_id}\"."
                ),
            ));
        }
    } else {
        let Some(org_name) = non_blank(token.string_claim("org_name")) else {
            return Err(ClaimValidationError::new(
                Claim::OrgName,
                "Organization Name (org_name) claim must be a string present in the ID token.",
            ));
        };

        if org_name.to_lowercase() != expected.to_lowercase() {
            return Err(ClaimValidationError::new(
                Claim::OrgName,
                format!(
                    "Organization Name (org_name) claim mismatch in the ID token; expected \"{expected}\", found \"{org_name}\"."
                ),
            ));
        }
    }
    Ok(())
}
