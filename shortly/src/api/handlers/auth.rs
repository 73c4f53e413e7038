//! Authentication endpoints: registration, confirmation, login, logout.

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState,
    api::models::auth::{
        AuthResponse, AuthSuccessResponse, ConfirmQuery, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, UserResponse,
    },
    auth::current_user::{CurrentUser, session_cookie_token},
    errors::Error,
};

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "auth",
    responses(
        (status = 201, description = "User registered successfully", body = UserResponse),
        (status = 400, description = "Invalid input or email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<(StatusCode, Json<UserResponse>), Error> {
    let user = state.auth.register(&request.email, &request.password).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Confirm a registration from the emailed token
#[utoipa::path(
    get,
    path = "/auth/confirm",
    params(("token" = String, Query, description = "Confirmation token from the registration email")),
    tag = "auth",
    responses(
        (status = 200, description = "Registration confirmed", body = AuthSuccessResponse),
        (status = 400, description = "Invalid or expired token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn confirm(State(state): State<AppState>, Query(query): Query<ConfirmQuery>) -> Result<Json<AuthSuccessResponse>, Error> {
    state.auth.confirm_registration(&query.token).await?;

    Ok(Json(AuthSuccessResponse {
        message: "Registration confirmed".to_string(),
    }))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    let outcome = state.auth.login(&request.email, &request.password).await?;

    let cookie = create_session_cookie(&outcome.token, &state.config);

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: UserResponse::from(outcome.user),
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (revoke the current session and clear the cookie)
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<LogoutResponse, Error> {
    // Revoke whatever session the cookie carries; a missing or garbage
    // cookie still gets the clearing response
    if let Some(token) = session_cookie_token(&headers, &state.config.auth.session.cookie_name) {
        state.auth.logout(&token).await?;
    }

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie: clear_session_cookie(&state.config),
    })
}

/// Logout everywhere (revoke every session of the current user)
#[utoipa::path(
    post,
    path = "/auth/logout-all",
    tag = "auth",
    responses(
        (status = 200, description = "All sessions revoked", body = AuthSuccessResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn logout_all(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<LogoutResponse, Error> {
    state.auth.revoke_all_sessions(user.id).await?;

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "All sessions revoked".to_string(),
        },
        cookie: clear_session_cookie(&state.config),
    })
}

/// Get the currently authenticated user
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Build the Set-Cookie value carrying a session token
pub fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.session;
    let max_age = session_config.timeout.as_secs();

    format!(
        "{}={}; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age={}",
        session_config.cookie_name, token, session_config.cookie_secure, session_config.cookie_same_site, max_age
    )
}

/// Build the Set-Cookie value that clears the session cookie
pub fn clear_session_cookie(config: &crate::config::Config) -> String {
    let session_config = &config.auth.session;

    format!(
        "{}=; Path=/; HttpOnly; Secure={}; SameSite={}; Max-Age=0",
        session_config.cookie_name, session_config.cookie_secure, session_config.cookie_same_site
    )
}
