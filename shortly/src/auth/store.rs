//! Session store: the authoritative record of live sessions.
//!
//! A session token only grants access while the exact token string is still
//! present under its (user id, session id) key. Deleting the entry revokes
//! the session immediately, regardless of the token's remaining signed
//! lifetime.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::errors::Result;
use crate::types::{SessionId, UserId};

/// Storage for live session tokens, keyed by (user id, session id).
///
/// Implementations must compare and return the exact stored token string;
/// entries outlive their TTL only until the next access.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a token under (user_id, session_id), replacing any previous
    /// entry for that pair. The entry expires after `ttl`.
    async fn put(&self, user_id: UserId, session_id: SessionId, token: String, ttl: Duration) -> Result<()>;

    /// Fetch the stored token string for (user_id, session_id), if present
    /// and not expired.
    async fn get(&self, user_id: UserId, session_id: SessionId) -> Result<Option<String>>;

    /// Remove a single session. Removing an absent session is not an error.
    async fn delete(&self, user_id: UserId, session_id: SessionId) -> Result<()>;

    /// Remove every session belonging to a user.
    async fn delete_all(&self, user_id: UserId) -> Result<()>;
}

#[derive(Debug, Clone)]
struct StoredSession {
    token: String,
    expires_at: Instant,
}

/// In-process session store backed by a concurrent map.
///
/// Expired entries are dropped lazily on access, and a user's bucket is
/// removed once its last session goes away.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<UserId, HashMap<SessionId, StoredSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, user_id: UserId, session_id: SessionId, token: String, ttl: Duration) -> Result<()> {
        let entry = StoredSession {
            token,
            expires_at: Instant::now() + ttl,
        };
        self.sessions.entry(user_id).or_default().insert(session_id, entry);
        Ok(())
    }

    async fn get(&self, user_id: UserId, session_id: SessionId) -> Result<Option<String>> {
        let now = Instant::now();

        let Some(mut user_sessions) = self.sessions.get_mut(&user_id) else {
            return Ok(None);
        };

        match user_sessions.get(&session_id) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.token.clone())),
            Some(_) => {
                // Lapsed: drop it so revocation state stays tidy
                user_sessions.remove(&session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, user_id: UserId, session_id: SessionId) -> Result<()> {
        if let Some(mut user_sessions) = self.sessions.get_mut(&user_id) {
            user_sessions.remove(&session_id);
            let empty = user_sessions.is_empty();
            drop(user_sessions);
            if empty {
                self.sessions.remove_if(&user_id, |_, sessions| sessions.is_empty());
            }
        }
        Ok(())
    }

    async fn delete_all(&self, user_id: UserId) -> Result<()> {
        self.sessions.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_put_and_get() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        store.put(user_id, session_id, "token-a".to_string(), TTL).await.unwrap();

        let token = store.get(user_id, session_id).await.unwrap();
        assert_eq!(token.as_deref(), Some("token-a"));
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let store = InMemorySessionStore::new();
        let token = store.get(Uuid::new_v4(), Uuid::new_v4()).await.unwrap();
        assert_eq!(token, None);
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        store.put(user_id, session_id, "token-a".to_string(), TTL).await.unwrap();
        store.put(user_id, session_id, "token-b".to_string(), TTL).await.unwrap();

        let token = store.get(user_id, session_id).await.unwrap();
        assert_eq!(token.as_deref(), Some("token-b"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_per_user() {
        let store = InMemorySessionStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        store.put(alice, session_id, "alice-token".to_string(), TTL).await.unwrap();

        // Same session id under a different user resolves nothing
        assert_eq!(store.get(bob, session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_gone() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        store
            .put(user_id, session_id, "token".to_string(), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get(user_id, session_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        store.put(user_id, session_id, "token".to_string(), TTL).await.unwrap();

        store.delete(user_id, session_id).await.unwrap();
        assert_eq!(store.get(user_id, session_id).await.unwrap(), None);

        // Second delete of the same session succeeds quietly
        store.delete(user_id, session_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_all_revokes_every_session() {
        let store = InMemorySessionStore::new();
        let user_id = Uuid::new_v4();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();

        store.put(user_id, s1, "t1".to_string(), TTL).await.unwrap();
        store.put(user_id, s2, "t2".to_string(), TTL).await.unwrap();

        store.delete_all(user_id).await.unwrap();

        assert_eq!(store.get(user_id, s1).await.unwrap(), None);
        assert_eq!(store.get(user_id, s2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_all_leaves_other_users_alone() {
        let store = InMemorySessionStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let alice_session = Uuid::new_v4();
        let bob_session = Uuid::new_v4();

        store.put(alice, alice_session, "a".to_string(), TTL).await.unwrap();
        store.put(bob, bob_session, "b".to_string(), TTL).await.unwrap();

        store.delete_all(alice).await.unwrap();

        assert_eq!(store.get(bob, bob_session).await.unwrap().as_deref(), Some("b"));
    }
}
