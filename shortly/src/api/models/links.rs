//! Short-link request and response payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::links::LinkRecord;
use crate::types::{LinkId, UserId};

/// Create a short link
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkCreateRequest {
    pub full_link: String,
}

/// Public view of a short link
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LinkResponse {
    #[schema(value_type = uuid::Uuid)]
    pub id: LinkId,
    pub full_link: String,
    pub short_code: String,
    #[schema(value_type = uuid::Uuid)]
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<LinkRecord> for LinkResponse {
    fn from(link: LinkRecord) -> Self {
        Self {
            id: link.id,
            full_link: link.full_link,
            short_code: link.short_code,
            owner_id: link.owner_id,
            created_at: link.created_at,
        }
    }
}

/// Resolution result for a public short-code lookup
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    pub full_link: String,
}
