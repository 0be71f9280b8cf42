//! HTTP handlers for account-service.

pub mod address;
pub mod admin;
pub mod auth;
pub mod metrics;
pub mod user;
