use crate::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use subtle::ConstantTimeEq;

pub const ADMIN_API_KEY_HEADER: &str = "x-admin-api-key";

/// Gate admin routes on the configured API key. An empty configured key
/// disables the admin surface entirely.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state.config.security.admin_api_key.as_bytes();
    let provided = headers
        .get(ADMIN_API_KEY_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();

    let valid = !expected.is_empty() && bool::from(provided.ct_eq(expected));
    if !valid {
        tracing::warn!("Failed admin authentication attempt");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid or missing admin API key"
        )));
    }

    Ok(next.run(request).await)
}
