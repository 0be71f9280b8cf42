use service_core::error::{AppError, FieldErrors};
use thiserror::Error;

/// Failure reported by a persistence store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("referenced row does not exist")]
    ForeignKeyViolation,

    #[error("timed out acquiring a database connection")]
    Timeout,

    #[error("database error: {0}")]
    Database(anyhow::Error),
}

impl StoreError {
    /// Classify a failure to open a transaction. Only here does an exhausted
    /// pool surface as a timeout; later pool waits are plain database errors.
    pub(crate) fn from_begin(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            other => other.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                StoreError::ForeignKeyViolation
            }
            other => StoreError::Database(anyhow::Error::new(other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Request timeout or canceled")]
    Timeout,

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error("Session store error: {0}")]
    Session(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation => ServiceError::Conflict("Resource already exists".to_string()),
            StoreError::ForeignKeyViolation => ServiceError::NotFound("Referenced resource not found".to_string()),
            StoreError::Timeout => ServiceError::Timeout,
            StoreError::Database(e) => ServiceError::Database(e),
        }
    }
}

/// Message shared by every credential failure so callers cannot tell an
/// unknown email from a wrong password.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(fields) => AppError::ValidationFailed(fields),
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!(INVALID_CREDENTIALS_MESSAGE))
            }
            ServiceError::Unauthorized => AppError::Unauthorized(anyhow::anyhow!("Unauthorized")),
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            ServiceError::Timeout => AppError::Timeout,
            ServiceError::Database(e) => AppError::DatabaseError(e),
            ServiceError::Session(e) => AppError::InternalError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
