//! Shared setup for account-service integration tests.
//!
//! Builds the full router over in-memory stores so every test exercises the
//! real middleware stack without PostgreSQL or Redis.

#![allow(dead_code)]

use account_service::{
    build_router,
    config::{
        AccountConfig, DatabaseConfig, Environment, RateLimitConfig, RedisConfig,
        SecurityConfig, SessionConfig,
    },
    services::{
        metrics, AddressService, AuthService, MockAddressStore, MockRoleStore,
        MockSessionStore, MockUserStore, RoleService, SessionManager, SessionSettings,
    },
    utils::RequestValidator,
    AppState,
};
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use service_core::middleware::rate_limit::{create_ip_rate_limiter, RateLimitPolicy};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_ADMIN_API_KEY: &str = "test-admin-key-12345";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> AccountConfig {
    AccountConfig {
        common: CoreConfig::default(),
        environment: Environment::Dev,
        service_name: "account-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://localhost/accounts_test".to_string(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_seconds: 5,
        },
        redis: RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
        },
        session: SessionConfig {
            cookie_name: "session_id".to_string(),
            expiration_hours: 24,
            cookie_secure: false,
            key_prefix: "session:".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            admin_api_key: TEST_ADMIN_API_KEY.to_string(),
        },
        rate_limit: RateLimitConfig {
            login_attempts: 5,
            login_window_seconds: 900,
            register_attempts: 3,
            register_window_seconds: 3600,
            global_ip_limit: 1000,
            global_ip_window_seconds: 60,
        },
    }
}

/// Router plus handles on the in-memory stores behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub users: MockUserStore,
    pub role_store: MockRoleStore,
    pub session_store: MockSessionStore,
    pub address_store: MockAddressStore,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config()).await
    }

    pub async fn spawn_with(config: AccountConfig) -> Self {
        metrics::init_metrics().expect("Failed to init metrics");

        let users = MockUserStore::new();
        let role_store = MockRoleStore::new();
        let session_store = MockSessionStore::new();
        let address_store = MockAddressStore::new();

        let sessions = SessionManager::new(
            Arc::new(session_store.clone()),
            SessionSettings {
                cookie_name: config.session.cookie_name.clone(),
                ttl_seconds: config.session.ttl_seconds(),
                cookie_secure: config.session.cookie_secure,
            },
        );

        let validator = RequestValidator::default();
        let roles = RoleService::new(
            Arc::new(role_store.clone()),
            Arc::new(users.clone()),
            validator.clone(),
        );
        let auth = AuthService::new(
            Arc::new(users.clone()),
            roles.clone(),
            sessions.clone(),
            validator.clone(),
        );
        let addresses = AddressService::new(Arc::new(address_store.clone()), validator);

        let limits = &config.rate_limit;
        let state = AppState {
            config: config.clone(),
            users: Arc::new(users.clone()),
            sessions,
            auth,
            roles,
            addresses,
            login_rate_limiter: create_ip_rate_limiter(RateLimitPolicy::new(
                limits.login_attempts,
                limits.login_window_seconds,
            )),
            register_rate_limiter: create_ip_rate_limiter(RateLimitPolicy::new(
                limits.register_attempts,
                limits.register_window_seconds,
            )),
            ip_rate_limiter: create_ip_rate_limiter(RateLimitPolicy::new(
                limits.global_ip_limit,
                limits.global_ip_window_seconds,
            )),
        };

        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        TestApp {
            router,
            state,
            users,
            role_store,
            session_store,
            address_store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, uri: &str, body: Value, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-admin-api-key", TEST_ADMIN_API_KEY)
            .header(header::CONTENT_TYPE, "application/json");
        let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Response<Body> {
        self.post_json(
            "/auth/register",
            json!({ "name": name, "email": email, "password": password }),
            None,
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response<Body> {
        self.post_json(
            "/auth/login",
            json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    /// Register and log in, returning the `name=value` cookie pair.
    pub async fn login_as(&self, name: &str, email: &str) -> String {
        let res = self.register(name, email, TEST_PASSWORD).await;
        assert_eq!(res.status(), 200, "registration failed");

        let res = self.login(email, TEST_PASSWORD).await;
        assert_eq!(res.status(), 200, "login failed");
        session_cookie(&res).expect("login did not set a session cookie")
    }

    /// Create a role through the admin API and return its id.
    pub async fn create_role(&self, name: &str) -> i64 {
        let res = self
            .admin(Method::POST, "/admin/roles", Some(json!({ "name": name })))
            .await;
        assert_eq!(res.status(), 201);
        body_json(res).await["id"].as_i64().unwrap()
    }

    /// Create a permission through the admin API and return its id.
    pub async fn create_permission(&self, name: &str) -> i64 {
        let res = self
            .admin(Method::POST, "/admin/permissions", Some(json!({ "name": name })))
            .await;
        assert_eq!(res.status(), 201);
        body_json(res).await["id"].as_i64().unwrap()
    }
}

/// `name=value` of the first `Set-Cookie` header, if any.
pub fn session_cookie(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|pair| pair.trim().to_string())
}

/// Full `Set-Cookie` header value.
pub fn set_cookie_header(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn body_json(res: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Failed to parse response")
}

pub fn valid_address() -> Value {
    json!({
        "jalan": "Jl. Merdeka No. 1",
        "RT": "001",
        "RW": "002",
        "Kota": "Bandung",
        "PostalCode": "40115"
    })
}
