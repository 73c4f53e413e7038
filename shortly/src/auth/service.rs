//! Account and session orchestration.
//!
//! [`AuthService`] ties the hashing, token, store, persistence, and mail
//! collaborators together. Every collaborator arrives through the
//! constructor, so tests wire in doubles without touching global state.

use std::sync::Arc;
use tracing::instrument;

use crate::auth::confirm::{issue_confirmation_token, verify_confirmation_token};
use crate::auth::password::{Argon2Params, hash_password_with_params, verify_password};
use crate::auth::session::{SessionClaims, TokenError, issue_session_token, verify_session_token};
use crate::auth::store::SessionStore;
use crate::config::Config;
use crate::db::errors::DbError;
use crate::db::handlers::users::UserStore;
use crate::db::models::users::{UserCreateDBRequest, UserRecord};
use crate::email::Mailer;
use crate::errors::{Error, Result};
use crate::types::{UserId, abbrev_uuid};

/// Canonical form for stored and compared email addresses.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A successful login: the persisted user plus the minted session.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserRecord,
    pub token: String,
    pub claims: SessionClaims,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    mailer: Arc<dyn Mailer>,
    config: Arc<Config>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: Arc<dyn SessionStore>, mailer: Arc<dyn Mailer>, config: Arc<Config>) -> Self {
        Self {
            users,
            sessions,
            mailer,
            config,
        }
    }

    fn secret_key(&self) -> Result<&str> {
        self.config.secret_key.as_deref().ok_or_else(|| Error::Internal {
            operation: "secret_key is required".to_string(),
        })
    }

    fn validate_password(&self, password: &str) -> Result<()> {
        let rules = &self.config.auth.password;
        if password.len() < rules.min_length {
            return Err(Error::BadRequest {
                message: format!("Password must be at least {} characters", rules.min_length),
            });
        }
        if password.len() > rules.max_length {
            return Err(Error::BadRequest {
                message: format!("Password must be at most {} characters", rules.max_length),
            });
        }
        Ok(())
    }

    /// Hash a password on the blocking pool; argon2 is deliberately expensive
    /// and must not stall the async runtime.
    async fn hash_password(&self, password: &str) -> Result<String> {
        let params = Argon2Params::from(&self.config.auth.password);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_password_with_params(&password, Some(params)))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("join password hashing task: {e}"),
            })?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("join password verification task: {e}"),
            })
    }

    /// Register a new account and hand off the confirmation email.
    ///
    /// The account starts inactive and unverified; redeeming the confirmation
    /// token activates it. The response does not wait for email delivery,
    /// which proceeds on a spawned task.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(&self, email: &str, password: &str) -> Result<UserRecord> {
        let email = normalize_email(email);
        self.validate_password(password)?;

        let password_hash = self.hash_password(password).await?;

        let request = UserCreateDBRequest::registration(email, password_hash);
        let user = self.users.create(&request).await.map_err(|e| match e {
            DbError::UniqueViolation { .. } => Error::AlreadyExists {
                message: "An account with this email address already exists".to_string(),
            },
            other => Error::from(other),
        })?;

        let token = issue_confirmation_token(&user.email, self.secret_key()?)?;

        let mailer = self.mailer.clone();
        let to_email = user.email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_confirmation_email(&to_email, &token).await {
                tracing::error!("Failed to send confirmation email to {to_email}: {e:#}");
            }
        });

        Ok(user)
    }

    /// Confirm a registration from the emailed token, activating and
    /// verifying the account in one write.
    ///
    /// Confirming an email that no longer maps to an account succeeds
    /// quietly; the response reveals nothing about which accounts exist.
    #[instrument(skip(self, token))]
    pub async fn confirm_registration(&self, token: &str) -> Result<()> {
        let max_age = self.config.auth.confirmation_token_max_age;
        let email = verify_confirmation_token(token, self.secret_key()?, max_age)?;

        let updated = self.users.mark_verified(&email).await?;
        if !updated {
            tracing::debug!("Confirmation token for unknown email, treating as no-op");
        }

        Ok(())
    }

    /// Log a user in with email and password.
    ///
    /// Unknown email and wrong password fail with the same
    /// [`Error::InvalidCredentials`]. Unconfirmed accounts may log in;
    /// confirmation only flips the flags reported to clients.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        self.login_checked(email, password, false).await
    }

    /// Log in requiring superuser privileges.
    ///
    /// A valid password on a non-superuser account still fails with
    /// [`Error::InvalidCredentials`], indistinguishable from a bad password.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login_superuser(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        self.login_checked(email, password, true).await
    }

    async fn login_checked(&self, email: &str, password: &str, require_superuser: bool) -> Result<LoginOutcome> {
        let email = normalize_email(email);
        let Some(user) = self.users.get_by_email(&email).await? else {
            return Err(Error::InvalidCredentials);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            return Err(Error::InvalidCredentials);
        }

        if require_superuser && !user.is_superuser {
            return Err(Error::InvalidCredentials);
        }

        let ttl = self.config.auth.session.timeout;
        let claims = SessionClaims::new(user.id, ttl);
        let token = issue_session_token(&claims, self.secret_key()?)?;

        self.sessions.put(user.id, claims.sid, token.clone(), ttl).await?;

        tracing::info!(user_id = %abbrev_uuid(&user.id), session_id = %abbrev_uuid(&claims.sid), "User logged in");

        Ok(LoginOutcome { user, token, claims })
    }

    /// Resolve a session token to its user.
    ///
    /// A token is authoritative only while the exact token string is still
    /// stored under its (user id, session id) pair. A signed, unexpired
    /// token whose store entry is gone (logout, revoke-all, replacement) is
    /// rejected.
    #[instrument(skip(self, token))]
    pub async fn resolve_current_user(&self, token: &str) -> Result<UserRecord> {
        let claims = verify_session_token(token, self.secret_key()?).map_err(|e| {
            match e {
                TokenError::Expired => tracing::debug!("Session token expired"),
                TokenError::Invalid => tracing::debug!("Session token invalid"),
            }
            Error::Unauthenticated { message: None }
        })?;

        let stored = self.sessions.get(claims.sub, claims.sid).await?;
        if stored.as_deref() != Some(token) {
            tracing::debug!(user_id = %abbrev_uuid(&claims.sub), "Session token not present in store");
            return Err(Error::Unauthenticated { message: None });
        }

        let user = self
            .users
            .get_by_id(claims.sub)
            .await?
            .ok_or(Error::Unauthenticated { message: None })?;

        Ok(user)
    }

    /// Revoke the session carried by this token.
    ///
    /// Idempotent: an already-revoked, expired, or garbage token is not an
    /// error, since the caller's goal (no live session) is already met.
    #[instrument(skip(self, token))]
    pub async fn logout(&self, token: &str) -> Result<()> {
        let Ok(claims) = verify_session_token(token, self.secret_key()?) else {
            return Ok(());
        };

        self.sessions.delete(claims.sub, claims.sid).await?;
        tracing::info!(user_id = %abbrev_uuid(&claims.sub), session_id = %abbrev_uuid(&claims.sid), "Session revoked");

        Ok(())
    }

    /// Revoke every session belonging to a user, across all devices.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)))]
    pub async fn revoke_all_sessions(&self, user_id: UserId) -> Result<()> {
        self.sessions.delete_all(user_id).await?;
        tracing::info!(user_id = %abbrev_uuid(&user_id), "All sessions revoked");
        Ok(())
    }

    /// Change a user's email address.
    #[instrument(skip(self, new_email), fields(user_id = %abbrev_uuid(&user_id)))]
    pub async fn change_email(&self, user_id: UserId, new_email: &str) -> Result<UserRecord> {
        let new_email = normalize_email(new_email);
        self.users.update_email(user_id, &new_email).await.map_err(|e| match e {
            DbError::UniqueViolation { .. } => Error::AlreadyExists {
                message: "An account with this email address already exists".to_string(),
            },
            other => Error::from(other),
        })
    }

    /// Change a user's password after re-checking the current one.
    #[instrument(skip(self, current_password, new_password), fields(user_id = %abbrev_uuid(&user_id)))]
    pub async fn change_password(&self, user_id: UserId, current_password: &str, new_password: &str) -> Result<UserRecord> {
        let user = self.users.get_by_id(user_id).await?.ok_or(Error::NotFound {
            resource: "User".to_string(),
        })?;

        if !self.verify_password(current_password, &user.password_hash).await? {
            return Err(Error::InvalidCredentials);
        }

        self.validate_password(new_password)?;
        let password_hash = self.hash_password(new_password).await?;

        Ok(self.users.update_password_hash(user_id, &password_hash).await?)
    }
}
