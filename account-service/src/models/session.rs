//! Session model - the loosely-typed map kept in the session store.

use serde_json::{Map, Value};

pub const KEY_USER_ID: &str = "user_id";
pub const KEY_EMAIL: &str = "email";
pub const KEY_AUTHENTICATED: &str = "authenticated";
pub const KEY_CREATED_AT: &str = "created_at";
pub const KEY_ROLE: &str = "role";

/// Raw session payload. Values are read defensively since the store does not
/// enforce types.
pub type SessionData = Map<String, Value>;

/// Identity attached to requests that passed the session guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: i64,
    pub email: String,
    pub role: Option<String>,
}

impl SessionUser {
    /// Build the payload written at login.
    pub fn to_session_data(&self, created_at: i64) -> SessionData {
        let mut data = SessionData::new();
        data.insert(KEY_USER_ID.to_string(), Value::from(self.user_id));
        data.insert(KEY_EMAIL.to_string(), Value::from(self.email.clone()));
        data.insert(KEY_AUTHENTICATED.to_string(), Value::Bool(true));
        data.insert(KEY_CREATED_AT.to_string(), Value::from(created_at));
        if let Some(role) = &self.role {
            data.insert(KEY_ROLE.to_string(), Value::from(role.clone()));
        }
        data
    }

    /// Read an authenticated identity back out of a session payload.
    ///
    /// `authenticated` must be the boolean `true`, and `user_id`/`email` must
    /// both be present with the right types; anything else yields `None`.
    pub fn from_session_data(data: &SessionData) -> Option<Self> {
        if data.get(KEY_AUTHENTICATED).and_then(Value::as_bool) != Some(true) {
            return None;
        }

        let user_id = data.get(KEY_USER_ID).and_then(Value::as_i64)?;
        let email = data.get(KEY_EMAIL).and_then(Value::as_str)?;
        let role = data
            .get(KEY_ROLE)
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            user_id,
            email: email.to_string(),
            role,
        })
    }
}
