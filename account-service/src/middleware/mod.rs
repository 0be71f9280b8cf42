pub mod admin;
pub mod metrics;
pub mod session;

pub use admin::admin_auth_middleware;
pub use metrics::metrics_middleware;
pub use session::{guest_guard, session_guard, AuthUser};
