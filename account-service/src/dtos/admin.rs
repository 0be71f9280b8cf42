use serde::Deserialize;
use validator::Validate;

use crate::utils::ValidatedRequest;

/// Body for creating a role or a permission.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateNamedRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

impl ValidatedRequest for CreateNamedRequest {}
