//! Signed session token creation and verification.
//!
//! Session tokens are HS256-signed JWTs carrying the user id and a random
//! per-login session id. A token is only proof of identity while the exact
//! token string is still present in the session store under that
//! (user id, session id) pair; the signature alone is not enough.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    errors::Error,
    types::{SessionId, UserId},
};

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: UserId,    // Subject (user ID)
    pub sid: SessionId, // Session ID, random per login
    pub exp: i64,       // Expiration time
    pub iat: i64,       // Issued at
}

impl SessionClaims {
    /// Create new session claims for a user, minting a fresh session id
    pub fn new(user_id: UserId, ttl: Duration) -> Self {
        let now = Utc::now();
        let exp = now + ttl;

        Self {
            sub: user_id,
            sid: Uuid::new_v4(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Why a session token failed verification.
///
/// Both kinds answer 401 at the HTTP boundary; the distinction exists so
/// callers can log and test them separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Signature valid but past expiry
    Expired,
    /// Malformed, tampered, wrong algorithm, or otherwise unverifiable
    Invalid,
}

/// Sign session claims into a token string
pub fn issue_session_token(claims: &SessionClaims, secret_key: &str) -> Result<String, Error> {
    let key = EncodingKey::from_secret(secret_key.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &key).map_err(|e| Error::Internal {
        operation: format!("sign session token: {e}"),
    })
}

/// Verify and decode a session token.
///
/// Only HS256 is accepted; a token whose header names any other algorithm is
/// rejected as [`TokenError::Invalid`] even if it would verify under that
/// algorithm.
pub fn verify_session_token(token: &str, secret_key: &str) -> Result<SessionClaims, TokenError> {
    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;

    Ok(token_data.claims)
}
