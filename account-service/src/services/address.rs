use chrono::Utc;
use std::sync::Arc;

use super::{
    address_store::AddressStore,
    error::{ServiceError, StoreError},
};
use crate::{
    dtos::address::CreateAddressRequest,
    models::{AddressResponse, NewAddress},
    utils::RequestValidator,
};

#[derive(Clone)]
pub struct AddressService {
    store: Arc<dyn AddressStore>,
    validator: RequestValidator,
}

impl AddressService {
    pub fn new(store: Arc<dyn AddressStore>, validator: RequestValidator) -> Self {
        Self { store, validator }
    }

    pub async fn create(&self, req: CreateAddressRequest) -> Result<AddressResponse, ServiceError> {
        self.validator.check(&req).map_err(ServiceError::Validation)?;

        let mut tx = self.store.begin().await?;
        let address = tx
            .create_address(NewAddress::from(req), Utc::now().timestamp())
            .await
            .map_err(write_failed)?;
        tx.commit().await.map_err(write_failed)?;

        tracing::info!(address_id = address.id, "Address created");
        Ok(AddressResponse::from(address))
    }

    pub async fn get(&self, id: i64) -> Result<AddressResponse, ServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .map(AddressResponse::from)
            .ok_or_else(|| ServiceError::NotFound("Address not found".to_string()))
    }
}

// Anything past `begin` that fails rolls the transaction back and is internal.
fn write_failed(err: StoreError) -> ServiceError {
    tracing::error!(error = %err, "Address write failed");
    ServiceError::Internal(anyhow::Error::new(err))
}
