//! Address model.

use serde::Serialize;
use sqlx::FromRow;

/// Address row as stored in `address`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Address {
    pub id: i64,
    pub jalan: String,
    pub rt: String,
    pub rw: String,
    pub kota: String,
    pub postal_code: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Validated insert payload.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub jalan: String,
    pub rt: String,
    pub rw: String,
    pub kota: String,
    pub postal_code: String,
}

impl NewAddress {
    pub fn into_address(self, id: i64, now: i64) -> Address {
        Address {
            id,
            jalan: self.jalan,
            rt: self.rt,
            rw: self.rw,
            kota: self.kota,
            postal_code: self.postal_code,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Address as returned to clients. Field names mirror the request payload.
#[derive(Debug, Clone, Serialize)]
pub struct AddressResponse {
    pub id: i64,
    pub jalan: String,
    #[serde(rename = "RT")]
    pub rt: String,
    #[serde(rename = "RW")]
    pub rw: String,
    #[serde(rename = "Kota")]
    pub kota: String,
    #[serde(rename = "PostalCode")]
    pub postal_code: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Address> for AddressResponse {
    fn from(a: Address) -> Self {
        Self {
            id: a.id,
            jalan: a.jalan,
            rt: a.rt,
            rw: a.rw,
            kota: a.kota,
            postal_code: a.postal_code,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}
