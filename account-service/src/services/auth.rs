use chrono::Utc;
use std::sync::Arc;

use super::{
    error::{ServiceError, StoreError},
    metrics,
    roles::RoleService,
    session::SessionManager,
    user_store::UserStore,
};
use crate::{
    dtos::auth::{LoginRequest, RegisterRequest},
    models::{NewUser, SessionUser, UserResponse, UserWithRoles},
    utils::{
        hash_password, verify_password, verify_password_against_dummy, Password,
        PasswordHashString, RequestValidator,
    },
};

const DUPLICATE_USER_MESSAGE: &str = "email or name already exist";

/// Result of a successful login: the user view plus the new session id.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: UserWithRoles,
    pub session_id: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    roles: RoleService,
    sessions: SessionManager,
    validator: RequestValidator,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: RoleService,
        sessions: SessionManager,
        validator: RequestValidator,
    ) -> Self {
        Self {
            users,
            roles,
            sessions,
            validator,
        }
    }

    /// Create a user. Either exactly one row is committed or none is.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse, ServiceError> {
        self.validator.check(&req).map_err(ServiceError::Validation)?;

        let password_hash = hash_password(&Password::new(req.password))
            .map_err(|e| ServiceError::Internal(anyhow::Error::new(e)))?;

        let mut tx = self.users.begin().await?;

        if tx.count_by_email(&req.email).await? > 0 || tx.count_by_name(&req.name).await? > 0 {
            return Err(ServiceError::Conflict(DUPLICATE_USER_MESSAGE.to_string()));
        }

        let new_user = NewUser::new(req.name, req.email, password_hash.into_string());
        let user = tx
            .create_user(new_user, Utc::now().timestamp())
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation => {
                    ServiceError::Conflict(DUPLICATE_USER_MESSAGE.to_string())
                }
                other => ServiceError::Internal(anyhow::Error::new(other)),
            })?;

        tx.commit().await.map_err(|e| match e {
            StoreError::UniqueViolation => ServiceError::Conflict(DUPLICATE_USER_MESSAGE.to_string()),
            StoreError::Timeout => ServiceError::Timeout,
            other => ServiceError::Internal(anyhow::Error::new(other)),
        })?;

        metrics::record_registration();
        tracing::info!(user_id = user.id, "User registered");

        Ok(UserResponse::from(user))
    }

    /// Verify credentials, resolve roles and open a session.
    ///
    /// An unknown email and a wrong password produce the same error.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginOutcome, ServiceError> {
        let result = self.login_inner(req).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(ServiceError::InvalidCredentials) => "invalid_credentials",
            Err(ServiceError::Validation(_)) => "invalid_request",
            Err(_) => "error",
        };
        metrics::record_login(outcome);
        result
    }

    async fn login_inner(&self, req: LoginRequest) -> Result<LoginOutcome, ServiceError> {
        self.validator.check(&req).map_err(ServiceError::Validation)?;

        let Some(user) = self.users.find_by_email(&req.email).await? else {
            let reason = verify_password_against_dummy(&Password::new(req.password));
            tracing::info!(reason = %reason, "Login rejected: unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        let stored = PasswordHashString::new(user.password.clone());
        if let Err(e) = verify_password(&Password::new(req.password), &stored) {
            tracing::info!(user_id = user.id, reason = %e, "Login rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        let roles = self.roles.roles_for_user(user.id).await.map_err(|e| {
            tracing::error!(user_id = user.id, error = %e, "Failed to resolve roles");
            ServiceError::Internal(anyhow::Error::new(e))
        })?;

        let user = UserWithRoles { user, roles };
        let session_user = SessionUser {
            user_id: user.user.id,
            email: user.user.email.clone(),
            role: user.primary_role().map(str::to_string),
        };

        let session_id = self
            .sessions
            .establish(&session_user, Utc::now().timestamp())
            .await?;

        tracing::info!(user_id = user.user.id, "User logged in");

        Ok(LoginOutcome { user, session_id })
    }

    pub async fn logout(&self, session_id: Option<&str>) -> Result<(), ServiceError> {
        if let Some(id) = session_id.filter(|id| !id.is_empty()) {
            self.sessions.destroy(id).await?;
        }
        Ok(())
    }

    /// Current user with roles. A session pointing at a vanished user is
    /// treated as unauthenticated.
    pub async fn me(&self, user_id: i64) -> Result<UserWithRoles, ServiceError> {
        self.roles
            .resolve_user_with_roles(user_id)
            .await?
            .ok_or(ServiceError::Unauthorized)
    }
}
