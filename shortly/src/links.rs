//! Short-link service: code generation, resolution, and owner-scoped
//! management.

use base64::{Engine as _, engine::general_purpose};
use rand::{Rng, thread_rng};
use std::sync::Arc;
use tracing::instrument;
use url::Url;

use crate::config::Config;
use crate::db::handlers::links::LinkStore;
use crate::db::models::links::{LinkCreateDBRequest, LinkRecord};
use crate::errors::{Error, Result};
use crate::types::{LinkId, UserId, abbrev_uuid};

/// Generate a URL-safe random short code from `n_bytes` of randomness.
pub fn generate_short_code(n_bytes: usize) -> String {
    let mut code_bytes = vec![0u8; n_bytes];
    thread_rng().fill(code_bytes.as_mut_slice());

    // Encode as base64url without padding
    general_purpose::URL_SAFE_NO_PAD.encode(code_bytes)
}

pub struct LinkService {
    links: Arc<dyn LinkStore>,
    config: Arc<Config>,
}

impl LinkService {
    pub fn new(links: Arc<dyn LinkStore>, config: Arc<Config>) -> Self {
        Self { links, config }
    }

    /// Create a short link owned by `owner_id`.
    ///
    /// Codes are random, so a collision is possible; the insert is retried
    /// with a fresh code up to the configured attempt limit, leaning on the
    /// unique index rather than a check-then-insert race.
    #[instrument(skip(self, full_link), fields(owner_id = %abbrev_uuid(&owner_id)))]
    pub async fn create_link(&self, owner_id: UserId, full_link: &str) -> Result<LinkRecord> {
        Url::parse(full_link).map_err(|_| Error::BadRequest {
            message: "full_link must be a valid absolute URL".to_string(),
        })?;

        let settings = &self.config.links;
        let mut last_collision = None;

        for attempt in 0..settings.max_generation_attempts {
            let request = LinkCreateDBRequest {
                full_link: full_link.to_string(),
                short_code: generate_short_code(settings.short_code_bytes),
                owner_id,
            };

            match self.links.create(&request).await {
                Ok(link) => return Ok(link),
                Err(e) if e.is_unique_violation_on("short_code") => {
                    tracing::debug!(attempt, "Short code collision, regenerating");
                    last_collision = Some(attempt);
                }
                Err(other) => return Err(Error::from(other)),
            }
        }

        tracing::warn!(attempts = ?last_collision.map(|a| a + 1), "Exhausted short code generation attempts");
        Err(Error::Internal {
            operation: "generate a unique short code".to_string(),
        })
    }

    /// Resolve a short code to its full URL. Public: no ownership check.
    #[instrument(skip(self))]
    pub async fn resolve(&self, short_code: &str) -> Result<LinkRecord> {
        self.links.get_by_code(short_code).await?.ok_or(Error::NotFound {
            resource: "Link".to_string(),
        })
    }

    /// List the links owned by a user.
    #[instrument(skip(self), fields(owner_id = %abbrev_uuid(&owner_id)))]
    pub async fn list(&self, owner_id: UserId) -> Result<Vec<LinkRecord>> {
        Ok(self.links.list_by_owner(owner_id).await?)
    }

    /// Delete a link. Unknown ids get [`Error::NotFound`]; ids owned by
    /// someone else get [`Error::Forbidden`].
    #[instrument(skip(self), fields(link_id = %abbrev_uuid(&link_id), requester = %abbrev_uuid(&requester_id)))]
    pub async fn delete(&self, link_id: LinkId, requester_id: UserId) -> Result<()> {
        let link = self.links.get_by_id(link_id).await?.ok_or(Error::NotFound {
            resource: "Link".to_string(),
        })?;

        if link.owner_id != requester_id {
            return Err(Error::Forbidden {
                resource: "link".to_string(),
            });
        }

        self.links.delete(link_id).await?;
        Ok(())
    }
}
