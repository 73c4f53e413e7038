//! Registration confirmation tokens.
//!
//! Confirmation tokens are HS256-signed JWTs carrying only the email address
//! and an issued-at timestamp. They carry no `exp` claim; instead the maximum
//! age is enforced at verification time against `iat`, so the acceptance
//! window is a property of the verifier rather than baked into the token.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;

/// Confirmation token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmationClaims {
    pub email: String, // Email address being confirmed
    pub iat: i64,      // Issued at
}

/// Sign a confirmation token for the given email address
pub fn issue_confirmation_token(email: &str, secret_key: &str) -> Result<String, Error> {
    let claims = ConfirmationClaims {
        email: email.to_string(),
        iat: Utc::now().timestamp(),
    };

    let key = EncodingKey::from_secret(secret_key.as_bytes());
    encode(&Header::new(Algorithm::HS256), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("sign confirmation token: {e}"),
    })
}

/// Verify a confirmation token and return the email it was issued for.
///
/// Fails with [`Error::InvalidOrExpiredToken`] when the signature does not
/// check out, the algorithm is not HS256, or the token is older than
/// `max_age`. The caller cannot distinguish the cases, which is fine: the
/// remedy (request a new confirmation email) is the same.
pub fn verify_confirmation_token(token: &str, secret_key: &str, max_age: Duration) -> Result<String, Error> {
    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // No exp claim on confirmation tokens; age is checked against iat below
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<ConfirmationClaims>(token, &key, &validation).map_err(|_| Error::InvalidOrExpiredToken)?;

    let age = Utc::now().timestamp() - token_data.claims.iat;
    if age < 0 || age as u64 > max_age.as_secs() {
        return Err(Error::InvalidOrExpiredToken);
    }

    Ok(token_data.claims.email)
}
