use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::{
    atomic::{AtomicBool, AtomicI64, Ordering},
    Arc, Mutex,
};

use super::error::StoreError;
use crate::models::{Address, NewAddress};

const ADDRESS_COLUMNS: &str = "id, jalan, rt, rw, kota, postal_code, created_at, updated_at";

#[async_trait]
pub trait AddressTransaction: Send {
    async fn create_address(&mut self, address: NewAddress, now: i64)
        -> Result<Address, StoreError>;
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn AddressTransaction>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Address>, StoreError>;
}

#[derive(Clone)]
pub struct PgAddressStore {
    pool: PgPool,
}

impl PgAddressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgAddressTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AddressTransaction for PgAddressTransaction {
    async fn create_address(
        &mut self,
        address: NewAddress,
        now: i64,
    ) -> Result<Address, StoreError> {
        let query = format!(
            "INSERT INTO address (jalan, rt, rw, kota, postal_code, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING {ADDRESS_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Address>(&query)
            .bind(&address.jalan)
            .bind(&address.rt)
            .bind(&address.rw)
            .bind(&address.kota)
            .bind(&address.postal_code)
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
impl AddressStore for PgAddressStore {
    async fn begin(&self) -> Result<Box<dyn AddressTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(StoreError::from_begin)?;
        Ok(Box::new(PgAddressTransaction { tx }))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Address>, StoreError> {
        let query = format!("SELECT {ADDRESS_COLUMNS} FROM address WHERE id = $1");
        let address = sqlx::query_as::<_, Address>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(address)
    }
}

#[derive(Clone, Default)]
pub struct MockAddressStore {
    rows: Arc<Mutex<Vec<Address>>>,
    next_id: Arc<AtomicI64>,
    begin_times_out: Arc<AtomicBool>,
    fail_inserts: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
}

impl MockAddressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_begin_times_out(&self, value: bool) {
        self.begin_times_out.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_inserts(&self, value: bool) {
        self.fail_inserts.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_commit(&self, value: bool) {
        self.fail_commit.store(value, Ordering::SeqCst);
    }

    pub fn address_count(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or_default()
    }
}

pub struct MockAddressTransaction {
    store: MockAddressStore,
    staged: Vec<Address>,
}

#[async_trait]
impl AddressTransaction for MockAddressTransaction {
    async fn create_address(
        &mut self,
        address: NewAddress,
        now: i64,
    ) -> Result<Address, StoreError> {
        if self.store.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database(anyhow::anyhow!("insert into addresses failed")));
        }
        let id = self.store.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = address.into_address(id, now);
        self.staged.push(created.clone());
        Ok(created)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MockAddressTransaction { store, staged } = *self;
        if store.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Database(anyhow::anyhow!("commit failed")));
        }
        store
            .rows
            .lock()
            .map_err(|e| StoreError::Database(anyhow::anyhow!("Mock address store poisoned: {}", e)))?
            .extend(staged);
        Ok(())
    }
}

#[async_trait]
impl AddressStore for MockAddressStore {
    async fn begin(&self) -> Result<Box<dyn AddressTransaction>, StoreError> {
        if self.begin_times_out.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        Ok(Box::new(MockAddressTransaction {
            store: self.clone(),
            staged: Vec::new(),
        }))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Address>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::Database(anyhow::anyhow!("Mock address store poisoned: {}", e)))?;
        Ok(rows.iter().find(|a| a.id == id).cloned())
    }
}
