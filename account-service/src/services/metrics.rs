use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Mutex, OnceLock};

pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static REGISTRATIONS_TOTAL: OnceLock<IntCounter> = OnceLock::new();
pub static LOGINS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Register every collector. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;
    let request_duration = HistogramVec::new(
        prometheus::HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )?;
    let registrations = IntCounter::new(
        "account_registrations_total",
        "Users registered successfully",
    )?;
    let logins = IntCounterVec::new(
        Opts::new("account_logins_total", "Login attempts by outcome"),
        &["outcome"],
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(request_duration.clone()))?;
    registry.register(Box::new(registrations.clone()))?;
    registry.register(Box::new(logins.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
    let _ = REGISTRATIONS_TOTAL.set(registrations);
    let _ = LOGINS_TOTAL.set(logins);

    Ok(())
}

pub fn record_registration() {
    if let Some(counter) = REGISTRATIONS_TOTAL.get() {
        counter.inc();
    }
}

/// `outcome` is one of `success`, `invalid_credentials`, `invalid_request` or `error`.
pub fn record_login(outcome: &str) {
    if let Some(counter) = LOGINS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
        format!("# Failed to convert metrics to UTF-8: {}\n", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_counters_are_exported() {
        init_metrics().unwrap();
        init_metrics().unwrap();
        record_registration();
        record_login("success");

        let text = get_metrics();
        assert!(text.contains("account_registrations_total"));
        assert!(text.contains("account_logins_total{outcome=\"success\"}"));
    }
}
