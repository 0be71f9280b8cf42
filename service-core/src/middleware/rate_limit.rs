use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Rate limiter keyed by client IP address
pub type IpRateLimiter = Arc<RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock>>;

/// `attempts` requests per `window_seconds`, replenished evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub attempts: u32,
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    pub fn new(attempts: u32, window_seconds: u64) -> Self {
        Self {
            attempts,
            window_seconds,
        }
    }

    fn quota(&self) -> Quota {
        let attempts = NonZeroU32::new(self.attempts.max(1)).unwrap_or(NonZeroU32::MIN);
        let period_ms = (self.window_seconds.max(1) * 1000) / u64::from(attempts.get());
        let period = Duration::from_millis(period_ms.max(1));
        // A non-zero period always yields a quota.
        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(attempts))
            .allow_burst(attempts)
    }
}

/// Create a keyed rate limiter (by IP)
pub fn create_ip_rate_limiter(policy: RateLimitPolicy) -> IpRateLimiter {
    Arc::new(RateLimiter::dashmap(policy.quota()))
}

/// Drop per-IP entries whose budget has fully replenished.
pub fn prune_ip_rate_limiters(limiters: &[IpRateLimiter]) {
    for limiter in limiters {
        limiter.retain_recent();
        limiter.shrink_to_fit();
    }
}

/// Prune `limiters` every `every` until the runtime shuts down.
pub fn spawn_rate_limiter_pruning(
    limiters: Vec<IpRateLimiter>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            prune_ip_rate_limiters(&limiters);
            let tracked: usize = limiters.iter().map(|l| l.len()).sum();
            tracing::debug!(tracked_ips = tracked, "Pruned rate limiter state");
        }
    })
}

/// Resolve the caller's IP: first `x-forwarded-for` hop, then the socket peer.
pub fn client_ip(request: &Request) -> Option<IpAddr> {
    let forwarded_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok());

    forwarded_ip.or_else(|| {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
    })
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(limiter): State<IpRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match client_ip(&request) {
        Some(ip) => match limiter.check_key(&ip) {
            Ok(_) => Ok(next.run(request).await),
            Err(negative) => {
                let wait_time = negative.wait_time_from(DefaultClock::default().now());
                tracing::warn!(client_ip = %ip, "Rate limit exceeded");
                Err(AppError::TooManyRequests(
                    "Too many requests from this IP. Please try again later.".to_string(),
                    Some(wait_time.as_secs()),
                ))
            }
        },
        None => {
            tracing::warn!("Could not determine IP for rate limiting");
            Ok(next.run(request).await)
        }
    }
}
