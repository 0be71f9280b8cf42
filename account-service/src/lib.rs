pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER},
    security_headers::security_headers_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AccountConfig;
use crate::middleware::admin::ADMIN_API_KEY_HEADER;
use crate::services::{
    AddressService, AuthService, RoleService, SessionManager, UserStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AccountConfig,
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionManager,
    pub auth: AuthService,
    pub roles: RoleService,
    pub addresses: AddressService,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Guest-only routes, each with its own rate limit
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let guest_routes = Router::new()
        .merge(login_route)
        .merge(register_route)
        .route_layer(from_fn_with_state(state.clone(), middleware::guest_guard));

    // Session-protected routes
    let session_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/users/me", get(handlers::user::get_me))
        .route("/address/create", post(handlers::address::create_address))
        .route("/address/:id", get(handlers::address::get_address))
        .route_layer(from_fn_with_state(state.clone(), middleware::session_guard));

    // Admin routes
    let admin_routes = Router::new()
        .route(
            "/admin/roles",
            post(handlers::admin::create_role).get(handlers::admin::list_roles),
        )
        .route("/admin/permissions", post(handlers::admin::create_permission))
        .route(
            "/admin/roles/:role_id/permissions/:permission_id",
            post(handlers::admin::grant_permission),
        )
        .route(
            "/admin/users/:user_id/roles/:role_id",
            post(handlers::admin::assign_role).delete(handlers::admin::remove_role),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::admin_auth_middleware,
        ));

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .merge(guest_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins));

    Ok(app)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(ADMIN_API_KEY_HEADER),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Service health check
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.users.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "PostgreSQL health check failed");
        AppError::DatabaseError(anyhow::Error::new(e))
    })?;

    state.sessions.store().health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Redis health check failed");
        AppError::InternalError(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "postgresql": "up",
            "redis": "up"
        }
    })))
}
