//! Role resolution and role administration.

use std::sync::Arc;

use super::{
    error::{ServiceError, StoreError},
    role_store::RoleStore,
    user_store::UserStore,
};
use crate::{
    dtos::admin::CreateNamedRequest,
    models::{aggregate_roles, Permission, Role, RoleWithPermissions, UserWithRoles},
    utils::RequestValidator,
};

#[derive(Clone)]
pub struct RoleService {
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
    validator: RequestValidator,
}

impl RoleService {
    pub fn new(
        roles: Arc<dyn RoleStore>,
        users: Arc<dyn UserStore>,
        validator: RequestValidator,
    ) -> Self {
        Self {
            roles,
            users,
            validator,
        }
    }

    /// Effective roles of a user, each with its deduplicated permissions.
    #[tracing::instrument(skip(self))]
    pub async fn roles_for_user(&self, user_id: i64) -> Result<Vec<RoleWithPermissions>, ServiceError> {
        let rows = self.roles.find_role_permission_rows(user_id).await?;
        Ok(aggregate_roles(rows))
    }

    /// `None` when the user does not exist.
    pub async fn resolve_user_with_roles(
        &self,
        user_id: i64,
    ) -> Result<Option<UserWithRoles>, ServiceError> {
        let Some(user) = self.users.find_by_id(user_id).await? else {
            return Ok(None);
        };
        let roles = self.roles_for_user(user.id).await?;
        Ok(Some(UserWithRoles { user, roles }))
    }

    pub async fn create_role(&self, req: CreateNamedRequest) -> Result<Role, ServiceError> {
        self.validator.check(&req).map_err(ServiceError::Validation)?;
        let role = self.roles.create_role(&req.name).await.map_err(|e| match e {
            StoreError::UniqueViolation => ServiceError::Conflict("Role already exists".to_string()),
            other => other.into(),
        })?;
        tracing::info!(role_id = role.id, role = %role.name, "Role created");
        Ok(role)
    }

    pub async fn create_permission(
        &self,
        req: CreateNamedRequest,
    ) -> Result<Permission, ServiceError> {
        self.validator.check(&req).map_err(ServiceError::Validation)?;
        let permission = self
            .roles
            .create_permission(&req.name)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation => {
                    ServiceError::Conflict("Permission already exists".to_string())
                }
                other => other.into(),
            })?;
        tracing::info!(permission_id = permission.id, permission = %permission.name, "Permission created");
        Ok(permission)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, ServiceError> {
        Ok(self.roles.list_roles().await?)
    }

    pub async fn grant_permission(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<(), ServiceError> {
        self.roles
            .grant_permission(role_id, permission_id)
            .await
            .map_err(|e| match e {
                StoreError::ForeignKeyViolation => {
                    ServiceError::NotFound("Role or permission not found".to_string())
                }
                other => other.into(),
            })?;
        tracing::info!(role_id, permission_id, "Permission granted to role");
        Ok(())
    }

    pub async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<(), ServiceError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }
        self.roles
            .assign_role_to_user(user_id, role_id)
            .await
            .map_err(|e| match e {
                StoreError::ForeignKeyViolation => {
                    ServiceError::NotFound("Role not found".to_string())
                }
                other => other.into(),
            })?;
        tracing::info!(user_id, role_id, "Role assigned to user");
        Ok(())
    }

    pub async fn remove_role(&self, user_id: i64, role_id: i64) -> Result<(), ServiceError> {
        if !self.roles.remove_role_from_user(user_id, role_id).await? {
            return Err(ServiceError::NotFound("Role assignment not found".to_string()));
        }
        tracing::info!(user_id, role_id, "Role removed from user");
        Ok(())
    }
}
