//! OpenAPI documentation for the HTTP API.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;

/// Registers the session cookie as a security scheme.
struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "session_cookie".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "Authorization",
                    "Session cookie issued by the login endpoints.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::auth::register,
        api::handlers::auth::confirm,
        api::handlers::auth::login,
        api::handlers::auth::logout,
        api::handlers::auth::logout_all,
        api::handlers::auth::me,
        api::handlers::profile::change_email,
        api::handlers::profile::change_password,
        api::handlers::links::create_link,
        api::handlers::links::list_links,
        api::handlers::links::resolve_link,
        api::handlers::links::delete_link,
        api::handlers::admin::admin_login,
        api::handlers::admin::admin_logout,
        api::handlers::admin::admin_session,
    ),
    components(schemas(
        api::models::auth::RegisterRequest,
        api::models::auth::LoginRequest,
        api::models::auth::ChangeEmailRequest,
        api::models::auth::ChangePasswordRequest,
        api::models::auth::UserResponse,
        api::models::auth::AuthResponse,
        api::models::auth::AuthSuccessResponse,
        api::models::auth::AdminSessionResponse,
        api::models::links::LinkCreateRequest,
        api::models::links::LinkResponse,
        api::models::links::ResolveResponse,
    )),
    modifiers(&SessionCookieAddon),
    tags(
        (name = "auth", description = "Registration, confirmation, and session management"),
        (name = "profile", description = "Self-service account changes"),
        (name = "links", description = "Short link management and resolution"),
        (name = "admin", description = "Admin panel session endpoints"),
    ),
    info(
        title = "shortly API",
        description = "Multi-tenant short link service with cookie-based sessions."
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in ["/auth/register", "/auth/login", "/links", "/links/{code}", "/admin/session"] {
            assert!(paths.contains_key(path), "missing {path} in OpenAPI document");
        }

        let components = doc.components.expect("components missing");
        assert!(components.security_schemes.contains_key("session_cookie"));
    }
}
