//! Test utilities: in-memory collaborator doubles and app construction.

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::auth::service::AuthService;
use crate::auth::store::InMemorySessionStore;
use crate::config::{Config, EmailTransportConfig};
use crate::db::errors::{DbError, Result as DbResult};
use crate::db::handlers::links::LinkStore;
use crate::db::handlers::users::UserStore;
use crate::db::models::links::{LinkCreateDBRequest, LinkRecord};
use crate::db::models::users::{UserCreateDBRequest, UserRecord};
use crate::email::Mailer;
use crate::errors::Error;
use crate::links::LinkService;
use crate::types::{LinkId, UserId};
use crate::{AppState, build_router};

pub fn create_test_config() -> Config {
    // Use temp directory for test emails
    let temp_dir = std::env::temp_dir().join(format!("shortly-test-emails-{}", std::process::id()));

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        frontend_url: "http://localhost:5173".to_string(),
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        email: crate::config::EmailConfig {
            transport: EmailTransportConfig::File {
                path: temp_dir.to_string_lossy().to_string(),
            },
            ..Default::default()
        },
        auth: crate::config::AuthConfig {
            password: crate::config::PasswordConfig {
                // Cheap hashing so test suites stay fast
                argon2_memory_kib: 8,
                argon2_iterations: 1,
                argon2_parallelism: 1,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

/// In-memory [`UserStore`] double with the same unique-email behavior as the
/// real table: uniqueness is case-insensitive and holds under concurrent
/// creates, via an email-keyed index whose entry lock serializes insertion.
#[derive(Default)]
pub struct InMemoryUsers {
    users: DashMap<UserId, UserRecord>,
    by_email: DashMap<String, UserId>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_superuser(&self, id: UserId, is_superuser: bool) {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.is_superuser = is_superuser;
        }
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }
}

fn email_unique_violation() -> DbError {
    DbError::UniqueViolation {
        constraint: Some("users_email_key".to_string()),
        table: Some("users".to_string()),
        message: "duplicate key value violates unique constraint".to_string(),
    }
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn create(&self, request: &UserCreateDBRequest) -> DbResult<UserRecord> {
        // The entry guard pins the email slot, so racing creates serialize
        // here and exactly one wins
        match self.by_email.entry(request.email.to_lowercase()) {
            Entry::Occupied(_) => Err(email_unique_violation()),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = UserRecord {
                    id: Uuid::new_v4(),
                    email: request.email.clone(),
                    password_hash: request.password_hash.clone(),
                    is_active: request.is_active,
                    is_superuser: request.is_superuser,
                    is_verified: request.is_verified,
                    created_at: now,
                    updated_at: now,
                };

                self.users.insert(user.id, user.clone());
                slot.insert(user.id);
                Ok(user)
            }
        }
    }

    async fn get_by_id(&self, id: UserId) -> DbResult<Option<UserRecord>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_by_email(&self, email: &str) -> DbResult<Option<UserRecord>> {
        let id = self.by_email.get(&email.to_lowercase()).map(|entry| *entry);
        Ok(id.and_then(|id| self.users.get(&id).map(|u| u.clone())))
    }

    async fn mark_verified(&self, email: &str) -> DbResult<bool> {
        let Some(id) = self.by_email.get(&email.to_lowercase()).map(|entry| *entry) else {
            return Ok(false);
        };
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(false);
        };

        user.is_active = true;
        user.is_verified = true;
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_email(&self, id: UserId, email: &str) -> DbResult<UserRecord> {
        let old_key = self.users.get(&id).map(|u| u.email.to_lowercase()).ok_or(DbError::NotFound)?;
        let new_key = email.to_lowercase();

        if new_key != old_key {
            match self.by_email.entry(new_key) {
                Entry::Occupied(_) => return Err(email_unique_violation()),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.by_email.remove(&old_key);
        }

        let mut user = self.users.get_mut(&id).ok_or(DbError::NotFound)?;
        user.email = email.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> DbResult<UserRecord> {
        let mut user = self.users.get_mut(&id).ok_or(DbError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

/// In-memory [`LinkStore`] double with the same unique-short-code behavior as
/// the real table.
#[derive(Default)]
pub struct InMemoryLinks {
    links: DashMap<LinkId, LinkRecord>,
}

impl InMemoryLinks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LinkStore for InMemoryLinks {
    async fn create(&self, request: &LinkCreateDBRequest) -> DbResult<LinkRecord> {
        if self.links.iter().any(|l| l.short_code == request.short_code) {
            return Err(DbError::UniqueViolation {
                constraint: Some("links_short_code_key".to_string()),
                table: Some("links".to_string()),
                message: "duplicate key value violates unique constraint".to_string(),
            });
        }

        let link = LinkRecord {
            id: Uuid::new_v4(),
            full_link: request.full_link.clone(),
            short_code: request.short_code.clone(),
            owner_id: request.owner_id,
            created_at: Utc::now(),
        };

        self.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn get_by_code(&self, short_code: &str) -> DbResult<Option<LinkRecord>> {
        Ok(self.links.iter().find(|l| l.short_code == short_code).map(|l| l.clone()))
    }

    async fn get_by_id(&self, id: LinkId) -> DbResult<Option<LinkRecord>> {
        Ok(self.links.get(&id).map(|l| l.clone()))
    }

    async fn list_by_owner(&self, owner_id: UserId) -> DbResult<Vec<LinkRecord>> {
        let mut links: Vec<LinkRecord> = self.links.iter().filter(|l| l.owner_id == owner_id).map(|l| l.clone()).collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }

    async fn delete(&self, id: LinkId) -> DbResult<bool> {
        Ok(self.links.remove(&id).is_some())
    }
}

/// A confirmation email captured by [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub token: String,
}

/// [`Mailer`] double that records instead of sending.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait for the next email to land; delivery runs on a spawned task, so
    /// callers poll rather than assume ordering.
    pub async fn wait_for_send(&self, timeout: Duration) -> SentEmail {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(mail) = self.sent.lock().unwrap().last().cloned() {
                return mail;
            }
            if Instant::now() >= deadline {
                panic!("no email sent within {timeout:?}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_confirmation_email(&self, to_email: &str, token: &str) -> Result<(), Error> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to_email.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }
}

/// [`Mailer`] double whose sends always fail, for exercising the
/// registration-does-not-wait-for-delivery path.
#[derive(Default)]
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send_confirmation_email(&self, _to_email: &str, _token: &str) -> Result<(), Error> {
        Err(Error::Internal {
            operation: "send email (simulated failure)".to_string(),
        })
    }
}

/// Handles to the doubles behind a [`create_test_app`] server.
pub struct TestApp {
    pub server: TestServer,
    pub users: Arc<InMemoryUsers>,
    pub sessions: Arc<InMemorySessionStore>,
    pub mailer: Arc<RecordingMailer>,
    pub links: Arc<InMemoryLinks>,
    pub config: Arc<Config>,
}

/// Build a [`TestServer`] wired entirely to in-memory collaborators.
pub fn create_test_app() -> TestApp {
    let config = Arc::new(create_test_config());
    let users = Arc::new(InMemoryUsers::new());
    let sessions = Arc::new(InMemorySessionStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let links = Arc::new(InMemoryLinks::new());

    let auth = Arc::new(AuthService::new(
        users.clone(),
        sessions.clone(),
        mailer.clone(),
        config.clone(),
    ));
    let link_service = Arc::new(LinkService::new(links.clone(), config.clone()));

    let state = AppState::builder().config(config.clone()).auth(auth).links(link_service).build();

    let router = build_router(state);
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        users,
        sessions,
        mailer,
        links,
        config,
    }
}
