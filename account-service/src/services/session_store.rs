use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use crate::models::SessionData;

/// Key-value session storage with store-managed expiry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>, anyhow::Error>;
    async fn save(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl_seconds: u64,
    ) -> Result<(), anyhow::Error>;
    /// Push the expiry of an existing session forward.
    async fn touch(&self, session_id: &str, ttl_seconds: u64) -> Result<(), anyhow::Error>;
    async fn destroy(&self, session_id: &str) -> Result<(), anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct RedisSessionStore {
    _client: Client,
    manager: ConnectionManager,
    key_prefix: String,
}

impl RedisSessionStore {
    pub async fn new(url: &str, key_prefix: &str) -> Result<Self, anyhow::Error> {
        tracing::info!("Connecting to Redis");
        let client = Client::open(url)?;

        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get Redis connection manager");
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>, anyhow::Error> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read session: {}", e))?;

        match raw {
            Some(raw) => {
                let data = serde_json::from_str::<SessionData>(&raw)
                    .map_err(|e| anyhow::anyhow!("Corrupt session payload: {}", e))?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl_seconds: u64,
    ) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let payload = serde_json::to_string(data)?;

        redis::cmd("SET")
            .arg(self.key(session_id))
            .arg(payload)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write session: {}", e))
    }

    async fn touch(&self, session_id: &str, ttl_seconds: u64) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("EXPIRE")
            .arg(self.key(session_id))
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to refresh session: {}", e))?;
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(self.key(session_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to delete session: {}", e))?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// In-memory session store. Expiry is recorded but not enforced.
#[derive(Clone, Default)]
pub struct MockSessionStore {
    sessions: Arc<Mutex<HashMap<String, (SessionData, u64)>>>,
    fail_writes: Arc<AtomicBool>,
    fail_touch: Arc<AtomicBool>,
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, value: bool) {
        self.fail_writes.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_touch(&self, value: bool) {
        self.fail_touch.store(value, Ordering::SeqCst);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionData> {
        self.sessions
            .lock()
            .ok()
            .and_then(|s| s.get(session_id).map(|(data, _)| data.clone()))
    }

    /// Store an arbitrary payload, bypassing login.
    pub fn insert_raw(&self, session_id: &str, data: SessionData) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session_id.to_string(), (data, 0));
        }
    }

    fn sessions(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (SessionData, u64)>>, anyhow::Error> {
        self.sessions
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock session store poisoned: {}", e))
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<SessionData>, anyhow::Error> {
        Ok(self.sessions()?.get(session_id).map(|(data, _)| data.clone()))
    }

    async fn save(
        &self,
        session_id: &str,
        data: &SessionData,
        ttl_seconds: u64,
    ) -> Result<(), anyhow::Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Failed to write session: store unavailable"));
        }
        self.sessions()?
            .insert(session_id.to_string(), (data.clone(), ttl_seconds));
        Ok(())
    }

    async fn touch(&self, session_id: &str, ttl_seconds: u64) -> Result<(), anyhow::Error> {
        if self.fail_touch.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Failed to refresh session: store unavailable"));
        }
        if let Some(entry) = self.sessions()?.get_mut(session_id) {
            entry.1 = ttl_seconds;
        }
        Ok(())
    }

    async fn destroy(&self, session_id: &str) -> Result<(), anyhow::Error> {
        self.sessions()?.remove(session_id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> SessionData {
        json!({ "user_id": 1, "email": "john@example.com", "authenticated": true })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn mock_round_trips_and_destroys() {
        let store = MockSessionStore::new();
        store.save("abc", &payload(), 60).await.unwrap();

        assert_eq!(store.load("abc").await.unwrap(), Some(payload()));
        store.destroy("abc").await.unwrap();
        assert!(store.load("abc").await.unwrap().is_none());
        // Destroying twice is fine.
        store.destroy("abc").await.unwrap();
    }

    #[tokio::test]
    async fn mock_failure_toggles() {
        let store = MockSessionStore::new();
        store.set_fail_writes(true);
        assert!(store.save("abc", &payload(), 60).await.is_err());
        assert_eq!(store.session_count(), 0);

        store.set_fail_touch(true);
        assert!(store.touch("abc", 60).await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis
    async fn redis_store_expires_and_deletes() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let store = RedisSessionStore::new(&url, "test-session:").await.unwrap();
        store.health_check().await.unwrap();

        let id = crate::services::session::generate_session_id();
        store.save(&id, &payload(), 30).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), Some(payload()));

        store.touch(&id, 60).await.unwrap();
        store.destroy(&id).await.unwrap();
        assert!(store.load(&id).await.unwrap().is_none());
    }
}
