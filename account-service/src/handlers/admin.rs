//! Role and permission administration, gated by the admin API key.

use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;

use crate::{
    dtos::admin::CreateNamedRequest,
    models::{Permission, Role},
    utils::{JsonPayload, PathParam},
    AppState,
};

pub async fn create_role(
    State(state): State<AppState>,
    JsonPayload(req): JsonPayload<CreateNamedRequest>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let role = state.roles.create_role(req).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, AppError> {
    Ok(Json(state.roles.list_roles().await?))
}

pub async fn create_permission(
    State(state): State<AppState>,
    JsonPayload(req): JsonPayload<CreateNamedRequest>,
) -> Result<(StatusCode, Json<Permission>), AppError> {
    let permission = state.roles.create_permission(req).await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

pub async fn grant_permission(
    State(state): State<AppState>,
    PathParam((role_id, permission_id)): PathParam<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    state.roles.grant_permission(role_id, permission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_role(
    State(state): State<AppState>,
    PathParam((user_id, role_id)): PathParam<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    state.roles.assign_role(user_id, role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_role(
    State(state): State<AppState>,
    PathParam((user_id, role_id)): PathParam<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    state.roles.remove_role(user_id, role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
