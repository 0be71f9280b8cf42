use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::AppError;

use crate::{models::SessionUser, AppState};

/// Reject requests without an authenticated session; expose the identity to
/// handlers through [`AuthUser`].
pub async fn session_guard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(req.headers());
    let session_id = state.sessions.session_id_from(&jar);

    let Some(user) = state.sessions.authorize(session_id.as_deref()).await else {
        return Err(AppError::Unauthorized(anyhow::anyhow!("Unauthorized")));
    };

    tracing::debug!(user_id = user.user_id, "Session authorized");
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Reject requests that already carry an authenticated session.
pub async fn guest_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = CookieJar::from_headers(req.headers());
    if let Some(session_id) = state.sessions.session_id_from(&jar) {
        if state.sessions.authorize(Some(session_id.as_str())).await.is_some() {
            return Err(AppError::Forbidden(anyhow::anyhow!("Already authenticated")));
        }
    }

    Ok(next.run(req).await)
}

/// Identity of the caller, placed in request extensions by [`session_guard`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionUser);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<SessionUser>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Session user missing from request extensions"
            ))
        })?;

        Ok(AuthUser(user.clone()))
    }
}
