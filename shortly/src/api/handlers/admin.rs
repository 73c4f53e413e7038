//! Admin panel endpoints.
//!
//! Admin login reuses the regular session machinery but refuses
//! non-superusers with the same response as bad credentials.

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};

use crate::{
    AppState,
    api::models::auth::{AdminSessionResponse, AuthResponse, AuthSuccessResponse, LoginRequest, LoginResponse, LogoutResponse, UserResponse},
    api::handlers::auth::{clear_session_cookie, create_session_cookie},
    auth::current_user::session_cookie_token,
    errors::Error,
};

/// Login to the admin panel (superusers only)
#[utoipa::path(
    post,
    path = "/admin/login",
    request_body = LoginRequest,
    tag = "admin",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    let outcome = state.auth.login_superuser(&request.email, &request.password).await?;

    let cookie = create_session_cookie(&outcome.token, &state.config);

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: UserResponse::from(outcome.user),
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout from the admin panel
#[utoipa::path(
    post,
    path = "/admin/logout",
    tag = "admin",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_logout(State(state): State<AppState>, headers: HeaderMap) -> Result<LogoutResponse, Error> {
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

/// Check whether the caller holds a valid admin session
#[utoipa::path(
    get,
    path = "/admin/session",
    tag = "admin",
    responses(
        (status = 200, description = "Session status", body = AdminSessionResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn admin_session(State(state): State<AppState>, headers: HeaderMap) -> Json<AdminSessionResponse> {
    let token = session_cookie_token(&headers, &state.config.auth.session.cookie_name);

    let user = match token {
        Some(token) => state.auth.resolve_current_user(&token).await.ok().filter(|user| user.is_superuser),
        None => None,
    };

    Json(AdminSessionResponse {
        authenticated: user.is_some(),
        user: user.map(UserResponse::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::users::UserStore;
    use crate::test_utils::{TestApp, create_test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    async fn register(app: &TestApp, email: &str) {
        let response = app
            .server
            .post("/auth/register")
            .json(&json!({"email": email, "password": "correct horse battery"}))
            .await;
        response.assert_status(StatusCode::CREATED);
    }

    fn cookie_from(response: &axum_test::TestResponse, cookie_name: &str) -> String {
        let set_cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        let token = set_cookie.strip_prefix(&format!("{cookie_name}=")).unwrap().split(';').next().unwrap();
        format!("{cookie_name}={token}")
    }

    #[tokio::test]
    async fn test_admin_login_requires_superuser() {
        let app = create_test_app();
        register(&app, "alice@example.com").await;

        let response = app
            .server
            .post("/admin/login")
            .json(&json!({"email": "alice@example.com", "password": "correct horse battery"}))
            .await;

        // Indistinguishable from bad credentials
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.text(), "Invalid email or password");
    }

    #[tokio::test]
    async fn test_admin_login_and_session() {
        let app = create_test_app();
        register(&app, "root@example.com").await;
        let root = app.users.get_by_email("root@example.com").await.unwrap().unwrap();
        app.users.set_superuser(root.id, true);

        let login = app
            .server
            .post("/admin/login")
            .json(&json!({"email": "root@example.com", "password": "correct horse battery"}))
            .await;
        login.assert_status_ok();

        let cookie = cookie_from(&login, &app.config.auth.session.cookie_name);

        let session = app.server.get("/admin/session").add_header("cookie", &cookie).await;
        session.assert_status_ok();
        let body: AdminSessionResponse = session.json();
        assert!(body.authenticated);
        assert_eq!(body.user.unwrap().email, "root@example.com");
    }

    #[tokio::test]
    async fn test_admin_session_without_cookie() {
        let app = create_test_app();

        let response = app.server.get("/admin/session").await;
        response.assert_status_ok();
        let body: AdminSessionResponse = response.json();
        assert!(!body.authenticated);
        assert!(body.user.is_none());
    }

    #[tokio::test]
    async fn test_admin_session_for_regular_user() {
        let app = create_test_app();
        register(&app, "alice@example.com").await;

        let login = app
            .server
            .post("/auth/login")
            .json(&json!({"email": "alice@example.com", "password": "correct horse battery"}))
            .await;
        login.assert_status_ok();
        let cookie = cookie_from(&login, &app.config.auth.session.cookie_name);

        let session = app.server.get("/admin/session").add_header("cookie", &cookie).await;
        session.assert_status_ok();
        let body: AdminSessionResponse = session.json();
        assert!(!body.authenticated);
    }

    #[tokio::test]
    async fn test_admin_logout() {
        let app = create_test_app();
        register(&app, "root@example.com").await;
        let root = app.users.get_by_email("root@example.com").await.unwrap().unwrap();
        app.users.set_superuser(root.id, true);

        let login = app
            .server
            .post("/admin/login")
            .json(&json!({"email": "root@example.com", "password": "correct horse battery"}))
            .await;
        let cookie = cookie_from(&login, &app.config.auth.session.cookie_name);

        let logout = app.server.post("/admin/logout").add_header("cookie", &cookie).await;
        logout.assert_status_ok();

        let session = app.server.get("/admin/session").add_header("cookie", &cookie).await;
        let body: AdminSessionResponse = session.json();
        assert!(!body.authenticated);
    }
}
