//! Database models for short links.

use crate::types::{LinkId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database request for creating a new short link
#[derive(Debug, Clone)]
pub struct LinkCreateDBRequest {
    pub full_link: String,
    pub short_code: String,
    pub owner_id: UserId,
}

/// Database entity model for a short link
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LinkRecord {
    pub id: LinkId,
    pub full_link: String,
    pub short_code: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}
