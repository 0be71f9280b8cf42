//! Cookie session lifecycle: issue, authorize, refresh, destroy.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use std::sync::Arc;

use super::{error::ServiceError, session_store::SessionStore};
use crate::models::SessionUser;

const SESSION_ID_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub ttl_seconds: u64,
    pub cookie_secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            ttl_seconds: 24 * 60 * 60,
            cookie_secure: false,
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    settings: SessionSettings,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, settings: SessionSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Persist a fresh authenticated session and return its id.
    pub async fn establish(&self, user: &SessionUser, now: i64) -> Result<String, ServiceError> {
        let session_id = generate_session_id();
        let data = user.to_session_data(now);

        self.store
            .save(&session_id, &data, self.settings.ttl_seconds)
            .await
            .map_err(ServiceError::Session)?;

        tracing::debug!(user_id = user.user_id, "Session established");
        Ok(session_id)
    }

    /// Resolve the identity behind a session id.
    ///
    /// Missing, unauthenticated or malformed sessions resolve to `None`, as do
    /// store read failures (logged). On success the expiry is refreshed; a
    /// failed refresh is logged and ignored.
    pub async fn authorize(&self, session_id: Option<&str>) -> Option<SessionUser> {
        let session_id = session_id.filter(|id| !id.is_empty())?;

        let data = match self.store.load(session_id).await {
            Ok(Some(data)) => data,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load session");
                return None;
            }
        };

        let user = SessionUser::from_session_data(&data)?;

        if let Err(e) = self.store.touch(session_id, self.settings.ttl_seconds).await {
            tracing::warn!(error = %e, user_id = user.user_id, "Failed to refresh session");
        }

        Some(user)
    }

    /// Remove a session server-side. Absent sessions are not an error.
    pub async fn destroy(&self, session_id: &str) -> Result<(), ServiceError> {
        self.store
            .destroy(session_id)
            .await
            .map_err(ServiceError::Session)
    }

    pub fn session_id_from(&self, jar: &CookieJar) -> Option<String> {
        jar.get(&self.settings.cookie_name)
            .map(|c| c.value().to_string())
    }

    pub fn cookie(&self, session_id: String) -> Cookie<'static> {
        Cookie::build((self.settings.cookie_name.clone(), session_id))
            .path("/")
            .http_only(true)
            .secure(self.settings.cookie_secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.settings.ttl_seconds as i64))
            .build()
    }

    /// Cookie that, when removed from a jar, clears the browser's copy.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.settings.cookie_name.clone(), ""))
            .path("/")
            .build()
    }
}

/// 256 bits of randomness, URL-safe base64 encoded.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
