use serde::Deserialize;
use validator::Validate;

use crate::utils::ValidatedRequest;

/// Missing fields deserialize as empty strings and are reported as `required`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,
}

impl ValidatedRequest for RegisterRequest {}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

impl ValidatedRequest for LoginRequest {}
