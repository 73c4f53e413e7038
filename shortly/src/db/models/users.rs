//! Database models for users.

use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
}

impl UserCreateDBRequest {
    /// A freshly registered user: not privileged, inactive and unverified
    /// until the emailed confirmation token is redeemed
    pub fn registration(email: String, password_hash: String) -> Self {
        Self {
            email,
            password_hash,
            is_active: false,
            is_superuser: false,
            is_verified: false,
        }
    }
}

/// Database entity model for a user account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
