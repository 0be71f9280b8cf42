use serde::Deserialize;
use validator::Validate;

use crate::{
    models::NewAddress,
    utils::{
        validation::{validate_postal_code, validate_rt_rw},
        ValidatedRequest,
    },
};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateAddressRequest {
    #[validate(length(min = 1))]
    pub jalan: String,

    #[serde(rename = "RT")]
    #[validate(custom(function = "validate_rt_rw"))]
    pub rt: String,

    #[serde(rename = "RW")]
    #[validate(custom(function = "validate_rt_rw"))]
    pub rw: String,

    #[serde(rename = "Kota")]
    #[validate(length(min = 1))]
    pub kota: String,

    #[serde(rename = "PostalCode")]
    #[validate(custom(function = "validate_postal_code"))]
    pub postal_code: String,
}

impl ValidatedRequest for CreateAddressRequest {
    fn wire_name(field: &str) -> &str {
        match field {
            "rt" => "RT",
            "rw" => "RW",
            "kota" => "Kota",
            "postal_code" => "PostalCode",
            other => other,
        }
    }
}

impl From<CreateAddressRequest> for NewAddress {
    fn from(req: CreateAddressRequest) -> Self {
        Self {
            jalan: req.jalan,
            rt: req.rt,
            rw: req.rw,
            kota: req.kota,
            postal_code: req.postal_code,
        }
    }
}
