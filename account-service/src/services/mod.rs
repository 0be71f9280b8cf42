//! Services layer for account-service.
//!
//! Business logic over the persistence stores: registration, login and
//! sessions, role resolution and administration, and addresses.

mod address;
pub mod address_store;
mod auth;
pub mod error;
pub mod metrics;
pub mod role_store;
mod roles;
pub mod session;
pub mod session_store;
pub mod user_store;

pub use address::AddressService;
pub use address_store::{AddressStore, MockAddressStore, PgAddressStore};
pub use auth::{AuthService, LoginOutcome};
pub use error::{ServiceError, StoreError};
pub use role_store::{MockRoleStore, PgRoleStore, RoleStore};
pub use roles::RoleService;
pub use session::{SessionManager, SessionSettings};
pub use session_store::{MockSessionStore, RedisSessionStore, SessionStore};
pub use user_store::{MockUserStore, PgUserStore, UserStore};
