//! User model - credential records and the resolved role view.

use serde::Serialize;
use sqlx::FromRow;

use super::role::RoleWithPermissions;

/// User row as stored in `users`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string; never serialized.
    pub password: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Insert payload for a user whose password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            name,
            email,
            password_hash,
        }
    }

    /// Materialize the stored row once the store has assigned an id.
    pub fn into_user(self, id: i64, now: i64) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password: self.password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A user together with its effective roles. Built per request, never stored.
#[derive(Debug, Clone)]
pub struct UserWithRoles {
    pub user: User,
    pub roles: Vec<RoleWithPermissions>,
}

impl UserWithRoles {
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }

    /// Role recorded in the session: the first resolved role, if any.
    pub fn primary_role(&self) -> Option<&str> {
        self.roles.first().map(|r| r.name.as_str())
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.roles.iter().any(|r| r.has_permission(permission))
    }
}

/// Public view of a freshly registered user.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            roles: Vec::new(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Role entry in an authenticated user's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub permissions: Vec<String>,
}

/// Public view returned by login and `/users/me`.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithRolesResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Vec<RoleResponse>,
}

impl From<UserWithRoles> for UserWithRolesResponse {
    fn from(u: UserWithRoles) -> Self {
        Self {
            id: u.user.id,
            name: u.user.name,
            email: u.user.email,
            roles: u
                .roles
                .into_iter()
                .map(|r| RoleResponse {
                    id: r.id,
                    name: r.name,
                    permissions: r.permissions,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        NewUser::new(
            "John Doe".to_string(),
            "john@example.com".to_string(),
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
        )
        .into_user(1, 1_700_000_000)
    }

    #[test]
    fn response_never_carries_the_hash() {
        let json = serde_json::to_string(&UserResponse::from(user())).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"roles\":[]"));
    }

    #[test]
    fn primary_role_is_first_resolved() {
        let view = UserWithRoles {
            user: user(),
            roles: vec![
                RoleWithPermissions::new(2, "editor".to_string()),
                RoleWithPermissions::new(5, "viewer".to_string()),
            ],
        };
        assert_eq!(view.primary_role(), Some("editor"));
        assert_eq!(view.role_names(), vec!["editor", "viewer"]);

        let none = UserWithRoles {
            user: user(),
            roles: Vec::new(),
        };
        assert_eq!(none.primary_role(), None);
    }
}
