//! Role model - roles, permissions and the user → role → permission fan-in.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;

/// Role entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// Permission entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    pub name: String,
}

/// One row of the role/permission join for a user.
///
/// `permission_name` is `None` when the role has no permissions attached
/// (outer join).
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RolePermissionRow {
    pub role_id: i64,
    pub role_name: String,
    pub permission_name: Option<String>,
}

impl RolePermissionRow {
    pub fn new(role_id: i64, role_name: &str, permission_name: Option<&str>) -> Self {
        Self {
            role_id,
            role_name: role_name.to_string(),
            permission_name: permission_name.map(str::to_string),
        }
    }
}

/// A role with its deduplicated, insertion-ordered permission names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleWithPermissions {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<String>,
}

impl RoleWithPermissions {
    pub fn new(id: i64, name: String) -> Self {
        Self {
            id,
            name,
            permissions: Vec::new(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    fn push_permission(&mut self, permission: &str) {
        if !permission.is_empty() && !self.has_permission(permission) {
            self.permissions.push(permission.to_string());
        }
    }
}

/// Fold join rows into roles.
///
/// Roles keep first-seen order and appear once per id; permission names are
/// appended once each, skipping empty and absent names.
pub fn aggregate_roles<I>(rows: I) -> Vec<RoleWithPermissions>
where
    I: IntoIterator<Item = RolePermissionRow>,
{
    let mut roles: Vec<RoleWithPermissions> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.role_id).or_insert_with(|| {
            roles.push(RoleWithPermissions::new(row.role_id, row.role_name.clone()));
            roles.len() - 1
        });

        if let Some(permission) = row.permission_name.as_deref() {
            roles[slot].push_permission(permission);
        }
    }

    roles
}
