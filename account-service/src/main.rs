use account_service::{
    build_router,
    config::AccountConfig,
    db,
    services::{
        metrics, AddressService, AuthService, PgAddressStore, PgRoleStore, PgUserStore,
        RedisSessionStore, RoleService, SessionManager, SessionSettings,
    },
    utils::RequestValidator,
    AppState,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::{
    create_ip_rate_limiter, spawn_rate_limiter_pruning, RateLimitPolicy,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // Load configuration - fail fast if invalid
    let config = AccountConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    metrics::init_metrics().map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting account service"
    );

    // PostgreSQL
    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    // Redis-backed sessions
    let session_store =
        RedisSessionStore::new(&config.redis.url, &config.session.key_prefix).await?;
    tracing::info!("Session store initialized");

    let users = Arc::new(PgUserStore::new(pool.clone()));
    let role_store = Arc::new(PgRoleStore::new(pool.clone()));
    let address_store = Arc::new(PgAddressStore::new(pool));

    let sessions = SessionManager::new(
        Arc::new(session_store),
        SessionSettings {
            cookie_name: config.session.cookie_name.clone(),
            ttl_seconds: config.session.ttl_seconds(),
            cookie_secure: config.session.cookie_secure,
        },
    );

    let validator = RequestValidator::default();
    let roles = RoleService::new(role_store, users.clone(), validator.clone());
    let auth = AuthService::new(
        users.clone(),
        roles.clone(),
        sessions.clone(),
        validator.clone(),
    );
    let addresses = AddressService::new(address_store, validator);

    let limits = &config.rate_limit;
    let login_rate_limiter = create_ip_rate_limiter(RateLimitPolicy::new(
        limits.login_attempts,
        limits.login_window_seconds,
    ));
    let register_rate_limiter = create_ip_rate_limiter(RateLimitPolicy::new(
        limits.register_attempts,
        limits.register_window_seconds,
    ));
    let ip_rate_limiter = create_ip_rate_limiter(RateLimitPolicy::new(
        limits.global_ip_limit,
        limits.global_ip_window_seconds,
    ));
    tracing::info!("Rate limiters initialized: Login, Register, and Global IP");
    spawn_rate_limiter_pruning(
        vec![
            login_rate_limiter.clone(),
            register_rate_limiter.clone(),
            ip_rate_limiter.clone(),
        ],
        RATE_LIMIT_PRUNE_INTERVAL,
    );

    let state = AppState {
        config: config.clone(),
        users,
        sessions,
        auth,
        roles,
        addresses,
        login_rate_limiter,
        register_rate_limiter,
        ip_rate_limiter,
    };
    let app = build_router(state).await?;

    let addr = config.common.socket_addr();

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
