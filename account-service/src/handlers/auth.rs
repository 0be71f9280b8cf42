use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{
    dtos::{
        auth::{LoginRequest, RegisterRequest},
        MessageResponse,
    },
    middleware::AuthUser,
    models::{UserResponse, UserWithRolesResponse},
    utils::JsonPayload,
    AppState,
};

/// Register a new user.
pub async fn register(
    State(state): State<AppState>,
    JsonPayload(req): JsonPayload<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.auth.register(req).await?;
    Ok(Json(user))
}

/// Login with email and password; sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonPayload(req): JsonPayload<LoginRequest>,
) -> Result<(CookieJar, Json<UserWithRolesResponse>), AppError> {
    let outcome = state.auth.login(req).await?;
    let jar = jar.add(state.sessions.cookie(outcome.session_id));
    Ok((jar, Json(UserWithRolesResponse::from(outcome.user))))
}

/// Destroy the current session and clear its cookie.
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let session_id = state.sessions.session_id_from(&jar);
    state.auth.logout(session_id.as_deref()).await?;

    tracing::info!(user_id = user.user_id, "User logged out");
    Ok((
        jar.remove(state.sessions.removal_cookie()),
        Json(MessageResponse::new("Logged out successfully")),
    ))
}
