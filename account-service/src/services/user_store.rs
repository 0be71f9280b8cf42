//! Credential store: user rows and the registration transaction.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc, Mutex,
};

use super::error::StoreError;
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, password, created_at, updated_at";

/// Write transaction for registration. Dropping it without `commit` rolls
/// back every staged write.
#[async_trait]
pub trait UserTransaction: Send {
    async fn count_by_email(&mut self, email: &str) -> Result<i64, StoreError>;
    async fn count_by_name(&mut self, name: &str) -> Result<i64, StoreError>;
    async fn create_user(&mut self, user: NewUser, now: i64) -> Result<User, StoreError>;
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgUserTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserTransaction for PgUserTransaction {
    async fn count_by_email(&mut self, email: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn count_by_name(&mut self, name: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE name = $1")
            .bind(name)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn create_user(&mut self, user: NewUser, now: i64) -> Result<User, StoreError> {
        let query = format!(
            "INSERT INTO users (name, email, password, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING {USER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, User>(&query)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(now)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(created)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(StoreError::from_begin)?;
        Ok(Box::new(PgUserTransaction { tx }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::db::health_check(&self.pool).await?;
        Ok(())
    }
}

/// In-memory user store. Writes become visible only on commit and ids are
/// drawn from a sequence that does not roll back, like a serial column.
#[derive(Clone, Default)]
pub struct MockUserStore {
    users: Arc<Mutex<Vec<User>>>,
    next_id: Arc<AtomicI64>,
    begin_times_out: Arc<AtomicBool>,
    fail_inserts: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
}

impl MockUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `begin` fail as if the pool were exhausted.
    pub fn set_begin_times_out(&self, value: bool) {
        self.begin_times_out.store(value, Ordering::SeqCst);
    }

    /// Make `create_user` fail with a non-constraint database error.
    pub fn set_fail_inserts(&self, value: bool) {
        self.fail_inserts.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_commit(&self, value: bool) {
        self.fail_commit.store(value, Ordering::SeqCst);
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().map(|u| u.len()).unwrap_or_default()
    }

    pub fn stored_user(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .ok()
            .and_then(|users| users.iter().find(|u| u.email == email).cloned())
    }

    fn snapshot(&self) -> Result<Vec<User>, StoreError> {
        self.users
            .lock()
            .map(|u| u.clone())
            .map_err(|e| StoreError::Database(anyhow::anyhow!("Mock user store poisoned: {}", e)))
    }
}

pub struct MockUserTransaction {
    store: MockUserStore,
    staged: Vec<User>,
}

impl MockUserTransaction {
    fn visible(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.store.snapshot()?;
        users.extend(self.staged.iter().cloned());
        Ok(users)
    }
}

#[async_trait]
impl UserTransaction for MockUserTransaction {
    async fn count_by_email(&mut self, email: &str) -> Result<i64, StoreError> {
        Ok(self.visible()?.iter().filter(|u| u.email == email).count() as i64)
    }

    async fn count_by_name(&mut self, name: &str) -> Result<i64, StoreError> {
        Ok(self.visible()?.iter().filter(|u| u.name == name).count() as i64)
    }

    async fn create_user(&mut self, user: NewUser, now: i64) -> Result<User, StoreError> {
        if self.store.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database(anyhow::anyhow!("insert into users failed")));
        }
        let clash = self
            .visible()?
            .iter()
            .any(|u| u.email == user.email || u.name == user.name);
        if clash {
            return Err(StoreError::UniqueViolation);
        }

        let id = self.store.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = user.into_user(id, now);
        self.staged.push(created.clone());
        Ok(created)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MockUserTransaction { store, staged } = *self;
        if store.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Database(anyhow::anyhow!("commit failed")));
        }
        let mut users = store
            .users
            .lock()
            .map_err(|e| StoreError::Database(anyhow::anyhow!("Mock user store poisoned: {}", e)))?;
        for user in &staged {
            if users.iter().any(|u| u.email == user.email || u.name == user.name) {
                return Err(StoreError::UniqueViolation);
            }
        }
        users.extend(staged);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>, StoreError> {
        if self.begin_times_out.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        Ok(Box::new(MockUserTransaction {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.snapshot()?.into_iter().find(|u| u.email == email))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.snapshot()?.into_iter().find(|u| u.id == id))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
