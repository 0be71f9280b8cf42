use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{middleware::AuthUser, models::UserWithRolesResponse, AppState};

/// The authenticated user with resolved roles and permissions.
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserWithRolesResponse>, AppError> {
    let me = state.auth.me(user.user_id).await?;
    Ok(Json(UserWithRolesResponse::from(me)))
}
