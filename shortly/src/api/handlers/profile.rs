//! Profile endpoints: change email, change password.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::auth::{AuthSuccessResponse, ChangeEmailRequest, ChangePasswordRequest, UserResponse},
    auth::current_user::CurrentUser,
    errors::Error,
};

/// Change the current user's email address
#[utoipa::path(
    put,
    path = "/profile/email",
    request_body = ChangeEmailRequest,
    tag = "profile",
    responses(
        (status = 200, description = "Email updated", body = UserResponse),
        (status = 400, description = "Email already in use"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("session_cookie" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn change_email(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ChangeEmailRequest>,
) -> Result<Json<UserResponse>, Error> {
    let updated = state.auth.change_email(user.id, &request.new_email).await?;

    Ok(Json(UserResponse::from(updated)))
}

/// Change the current user's password
#[utoipa::path(
    put,
    path = "/profile/password",
    request_body = ChangePasswordRequest,
    tag = "profile",
    responses(
        (status = 200, description = "Password updated", body = AuthSuccessResponse),
        (status = 400, description = "New password fails validation"),
        (status = 401, description = "Current password incorrect or not authenticated"),
    ),
    security(("session_cookie" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<AuthSuccessResponse>, Error> {
    state.auth.change_password(user.id, &request.current_password, &request.new_password).await?;

    Ok(Json(AuthSuccessResponse {
        message: "Password updated".to_string(),
    }))
}
