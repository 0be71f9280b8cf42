pub mod password;
pub mod validation;

pub use password::{
    hash_password, verify_password, verify_password_against_dummy, Password, PasswordError,
    PasswordHashString,
};
pub use validation::{JsonPayload, MessageCatalog, PathParam, RequestValidator, ValidatedRequest};
