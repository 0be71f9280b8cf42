use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::{
    dtos::address::CreateAddressRequest, middleware::AuthUser, models::AddressResponse,
    utils::{JsonPayload, PathParam},
    AppState,
};

pub async fn create_address(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonPayload(req): JsonPayload<CreateAddressRequest>,
) -> Result<Json<AddressResponse>, AppError> {
    let address = state.addresses.create(req).await?;
    tracing::debug!(user_id = user.user_id, address_id = address.id, "Address created by user");
    Ok(Json(address))
}

pub async fn get_address(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<AddressResponse>, AppError> {
    Ok(Json(state.addresses.get(id).await?))
}
