//! Role/permission store.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};

use super::error::StoreError;
use crate::models::{Permission, Role, RolePermissionRow};

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Join rows for every role held by `user_id`, ordered by role id then
    /// permission name. Roles without permissions yield one row with no name.
    async fn find_role_permission_rows(
        &self,
        user_id: i64,
    ) -> Result<Vec<RolePermissionRow>, StoreError>;

    async fn create_role(&self, name: &str) -> Result<Role, StoreError>;
    async fn create_permission(&self, name: &str) -> Result<Permission, StoreError>;
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    /// Idempotent.
    async fn grant_permission(&self, role_id: i64, permission_id: i64) -> Result<(), StoreError>;

    /// Idempotent.
    async fn assign_role_to_user(&self, user_id: i64, role_id: i64) -> Result<(), StoreError>;

    /// Returns whether an assignment was removed.
    async fn remove_role_from_user(&self, user_id: i64, role_id: i64) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn find_role_permission_rows(
        &self,
        user_id: i64,
    ) -> Result<Vec<RolePermissionRow>, StoreError> {
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r#"
            SELECT r.id AS role_id, r.name AS role_name, p.name AS permission_name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.roles_id
            LEFT JOIN roles_permissions rp ON rp.role_id = r.id
            LEFT JOIN permissions p ON p.id = rp.permission_id
            WHERE ur.user_id = $1
            ORDER BY r.id, p.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn create_role(&self, name: &str) -> Result<Role, StoreError> {
        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(role)
    }

    async fn create_permission(&self, name: &str) -> Result<Permission, StoreError> {
        let permission = sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(permission)
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn grant_permission(&self, role_id: i64, permission_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO roles_permissions (role_id, permission_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(role_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn assign_role_to_user(&self, user_id: i64, role_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, roles_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_role_from_user(&self, user_id: i64, role_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND roles_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
struct RoleTables {
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    role_permissions: Vec<(i64, i64)>,
    user_roles: Vec<(i64, i64)>,
}

/// In-memory role store with the same ordering and integrity rules as the
/// relational schema.
#[derive(Clone, Default)]
pub struct MockRoleStore {
    tables: Arc<Mutex<RoleTables>>,
}

impl MockRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(
        &self,
        f: impl FnOnce(&mut RoleTables) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|e| StoreError::Database(anyhow::anyhow!("Mock role store poisoned: {}", e)))?;
        f(&mut tables)
    }
}

#[async_trait]
impl RoleStore for MockRoleStore {
    async fn find_role_permission_rows(
        &self,
        user_id: i64,
    ) -> Result<Vec<RolePermissionRow>, StoreError> {
        self.with_tables(|t| {
            let mut held: Vec<&Role> = t
                .roles
                .iter()
                .filter(|r| t.user_roles.contains(&(user_id, r.id)))
                .collect();
            held.sort_by_key(|r| r.id);

            let mut rows = Vec::new();
            for role in held {
                let mut names: Vec<&str> = t
                    .permissions
                    .iter()
                    .filter(|p| t.role_permissions.contains(&(role.id, p.id)))
                    .map(|p| p.name.as_str())
                    .collect();
                names.sort_unstable();

                if names.is_empty() {
                    rows.push(RolePermissionRow::new(role.id, &role.name, None));
                }
                for name in names {
                    rows.push(RolePermissionRow::new(role.id, &role.name, Some(name)));
                }
            }
            Ok(rows)
        })
    }

    async fn create_role(&self, name: &str) -> Result<Role, StoreError> {
        self.with_tables(|t| {
            if t.roles.iter().any(|r| r.name == name) {
                return Err(StoreError::UniqueViolation);
            }
            let role = Role {
                id: t.roles.len() as i64 + 1,
                name: name.to_string(),
            };
            t.roles.push(role.clone());
            Ok(role)
        })
    }

    async fn create_permission(&self, name: &str) -> Result<Permission, StoreError> {
        self.with_tables(|t| {
            if t.permissions.iter().any(|p| p.name == name) {
                return Err(StoreError::UniqueViolation);
            }
            let permission = Permission {
                id: t.permissions.len() as i64 + 1,
                name: name.to_string(),
            };
            t.permissions.push(permission.clone());
            Ok(permission)
        })
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        self.with_tables(|t| Ok(t.roles.clone()))
    }

    async fn grant_permission(&self, role_id: i64, permission_id: i64) -> Result<(), StoreError> {
        self.with_tables(|t| {
            let known = t.roles.iter().any(|r| r.id == role_id)
                && t.permissions.iter().any(|p| p.id == permission_id);
            if !known {
                return Err(StoreError::ForeignKeyViolation);
            }
            if !t.role_permissions.contains(&(role_id, permission_id)) {
                t.role_permissions.push((role_id, permission_id));
            }
            Ok(())
        })
    }

    async fn assign_role_to_user(&self, user_id: i64, role_id: i64) -> Result<(), StoreError> {
        self.with_tables(|t| {
            if !t.roles.iter().any(|r| r.id == role_id) {
                return Err(StoreError::ForeignKeyViolation);
            }
            if !t.user_roles.contains(&(user_id, role_id)) {
                t.user_roles.push((user_id, role_id));
            }
            Ok(())
        })
    }

    async fn remove_role_from_user(&self, user_id: i64, role_id: i64) -> Result<bool, StoreError> {
        self.with_tables(|t| {
            let before = t.user_roles.len();
            t.user_roles.retain(|pair| *pair != (user_id, role_id));
            Ok(t.user_roles.len() != before)
        })
    }
}
