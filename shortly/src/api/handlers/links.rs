//! Short-link endpoints.
//!
//! Creation, listing, and deletion require a session; resolution by short
//! code is public.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::links::{LinkCreateRequest, LinkResponse, ResolveResponse},
    auth::current_user::CurrentUser,
    errors::Error,
    types::LinkId,
};

/// Create a short link
#[utoipa::path(
    post,
    path = "/links",
    request_body = LinkCreateRequest,
    tag = "links",
    responses(
        (status = 201, description = "Link created", body = LinkResponse),
        (status = 400, description = "Target is not a valid URL"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_link(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<LinkCreateRequest>,
) -> Result<(StatusCode, Json<LinkResponse>), Error> {
    let link = state.links.create_link(user.id, &request.full_link).await?;

    Ok((StatusCode::CREATED, Json(LinkResponse::from(link))))
}

/// List the current user's links
#[utoipa::path(
    get,
    path = "/links",
    tag = "links",
    responses(
        (status = 200, description = "The caller's links", body = Vec<LinkResponse>),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_links(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<LinkResponse>>, Error> {
    let links = state.links.list(user.id).await?;

    Ok(Json(links.into_iter().map(LinkResponse::from).collect()))
}

/// Resolve a short code to its target URL
#[utoipa::path(
    get,
    path = "/links/{code}",
    params(("code" = String, Path, description = "Short code to resolve")),
    tag = "links",
    responses(
        (status = 200, description = "Resolved target", body = ResolveResponse),
        (status = 404, description = "No link with this code"),
    )
)]
#[tracing::instrument(skip_all, fields(code = %code))]
pub async fn resolve_link(State(state): State<AppState>, Path(code): Path<String>) -> Result<Json<ResolveResponse>, Error> {
    let link = state.links.resolve(&code).await?;

    Ok(Json(ResolveResponse { full_link: link.full_link }))
}

/// Delete one of the current user's links
#[utoipa::path(
    delete,
    path = "/links/{id}",
    params(("id" = Uuid, Path, description = "Link id")),
    tag = "links",
    responses(
        (status = 204, description = "Link deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Link belongs to another user"),
        (status = 404, description = "No such link"),
    ),
    security(("session_cookie" = []))
)]
#[tracing::instrument(skip_all, fields(link_id = %link_id))]
pub async fn delete_link(State(state): State<AppState>, CurrentUser(user): CurrentUser, Path(link_id): Path<LinkId>) -> Result<StatusCode, Error> {
    state.links.delete(link_id, user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestApp, create_test_app};
    use serde_json::json;

    async fn login_as(app: &TestApp, email: &str) -> String {
        let register = app
            .server
            .post("/auth/register")
            .json(&json!({"email": email, "password": "correct horse battery"}))
            .await;
        register.assert_status(StatusCode::CREATED);

        let login = app
            .server
            .post("/auth/login")
            .json(&json!({"email": email, "password": "correct horse battery"}))
            .await;
        login.assert_status_ok();

        let cookie_name = &app.config.auth.session.cookie_name;
        let set_cookie = login.headers().get("set-cookie").unwrap().to_str().unwrap();
        let token = set_cookie.strip_prefix(&format!("{cookie_name}=")).unwrap().split(';').next().unwrap();
        format!("{cookie_name}={token}")
    }

    #[tokio::test]
    async fn test_create_and_resolve() {
        let app = create_test_app();
        let cookie = login_as(&app, "alice@example.com").await;

        let created = app
            .server
            .post("/links")
            .add_header("cookie", &cookie)
            .json(&json!({"full_link": "https://example.com/some/long/path"}))
            .await;
        created.assert_status(StatusCode::CREATED);
        let link: LinkResponse = created.json();

        // Resolution is public, no cookie needed
        let resolved = app.server.get(&format!("/links/{}", link.short_code)).await;
        resolved.assert_status_ok();
        let body: ResolveResponse = resolved.json();
        assert_eq!(body.full_link, "https://example.com/some/long/path");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_url() {
        let app = create_test_app();
        let cookie = login_as(&app, "alice@example.com").await;

        let response = app
            .server
            .post("/links")
            .add_header("cookie", &cookie)
            .json(&json!({"full_link": "not a url"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_requires_auth() {
        let app = create_test_app();

        let response = app.server.post("/links").json(&json!({"full_link": "https://example.com"})).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_resolve_unknown_code() {
        let app = create_test_app();

        let response = app.server.get("/links/nope").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_only_own_links() {
        let app = create_test_app();
        let alice = login_as(&app, "alice@example.com").await;
        let bob = login_as(&app, "bob@example.com").await;

        for url in ["https://example.com/a", "https://example.com/b"] {
            let response = app.server.post("/links").add_header("cookie", &alice).json(&json!({"full_link": url})).await;
            response.assert_status(StatusCode::CREATED);
        }
        let response = app
            .server
            .post("/links")
            .add_header("cookie", &bob)
            .json(&json!({"full_link": "https://example.com/c"}))
            .await;
        response.assert_status(StatusCode::CREATED);

        let listed = app.server.get("/links").add_header("cookie", &alice).await;
        listed.assert_status_ok();
        let links: Vec<LinkResponse> = listed.json();
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_own_link() {
        let app = create_test_app();
        let cookie = login_as(&app, "alice@example.com").await;

        let created = app
            .server
            .post("/links")
            .add_header("cookie", &cookie)
            .json(&json!({"full_link": "https://example.com/gone"}))
            .await;
        let link: LinkResponse = created.json();

        let deleted = app.server.delete(&format!("/links/{}", link.id)).add_header("cookie", &cookie).await;
        deleted.assert_status(StatusCode::NO_CONTENT);

        let resolved = app.server.get(&format!("/links/{}", link.short_code)).await;
        resolved.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_foreign_link_forbidden() {
        let app = create_test_app();
        let alice = login_as(&app, "alice@example.com").await;
        let bob = login_as(&app, "bob@example.com").await;

        let created = app
            .server
            .post("/links")
            .add_header("cookie", &alice)
            .json(&json!({"full_link": "https://example.com/mine"}))
            .await;
        let link: LinkResponse = created.json();

        let response = app.server.delete(&format!("/links/{}", link.id)).add_header("cookie", &bob).await;
        response.assert_status(StatusCode::FORBIDDEN);

        // Still resolvable
        let resolved = app.server.get(&format!("/links/{}", link.short_code)).await;
        resolved.assert_status_ok();
    }
}
