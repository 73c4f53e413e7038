//! Request extractor for the authenticated user.

use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};
use tracing::instrument;

use crate::{
    AppState,
    db::models::users::UserRecord,
    errors::{Error, Result},
};

/// The user behind the request's session cookie.
///
/// Extraction fails with 401 when the cookie is absent, the token does not
/// verify, or the session is no longer present in the store.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

/// Pull the session token out of the Cookie header, if present.
pub fn session_cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers.get(axum::http::header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name {
                return Some(value.to_string());
            }
        }
    }
    None
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let cookie_name = &state.config.auth.session.cookie_name;
        let token = session_cookie_token(&parts.headers, cookie_name).ok_or(Error::Unauthenticated { message: None })?;

        let user = state.auth.resolve_current_user(&token).await?;

        Ok(CurrentUser(user))
    }
}

/// Like [`CurrentUser`], but additionally requires the superuser flag.
///
/// Non-superusers get 403: they are authenticated, just not allowed here.
#[derive(Debug, Clone)]
pub struct CurrentSuperuser(pub UserRecord);

impl FromRequestParts<AppState> for CurrentSuperuser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if !user.is_superuser {
            return Err(Error::Forbidden {
                resource: "admin panel".to_string(),
            });
        }

        Ok(CurrentSuperuser(user))
    }
}
