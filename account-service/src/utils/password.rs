use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::{fmt, sync::OnceLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("invalid password hash format")]
    MalformedHash,

    #[error("password does not match")]
    Mismatch,
}

/// Plaintext password. Debug output is redacted.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// PHC-formatted Argon2 hash (algorithm, cost, salt and digest in one string).
#[derive(Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for PasswordHashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHashString(***)")
    }
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?
        .to_string();

    Ok(PasswordHashString::new(hash))
}

/// Verify a password against a stored hash.
///
/// Parameters are read from the hash itself, so hashes produced with older
/// cost settings still verify.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(password_hash.as_str()).map_err(|_| PasswordError::MalformedHash)?;

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}

static DUMMY_HASH: OnceLock<Option<PasswordHashString>> = OnceLock::new();

/// Spend the same Argon2 work as a real verification when there is no
/// stored hash to check. The dummy secret is random, so this never matches.
pub fn verify_password_against_dummy(password: &Password) -> PasswordError {
    let dummy = DUMMY_HASH.get_or_init(|| {
        let secret = SaltString::generate(&mut OsRng);
        hash_password(&Password::new(secret.as_str().to_string()))
            .map_err(|e| tracing::error!(error = %e, "Failed to prepare dummy password hash"))
            .ok()
    });

    match dummy {
        Some(hash) => match verify_password(password, hash) {
            Ok(()) => PasswordError::Mismatch,
            Err(e) => e,
        },
        None => PasswordError::Mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_phc_and_not_plaintext() {
        let password = Password::new("password123".to_string());
        let hash = hash_password(&password).expect("hash");

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert_ne!(hash.as_str(), password.as_str());
    }

    #[test]
    fn verifies_only_the_right_password() {
        let password = Password::new("password123".to_string());
        let hash = hash_password(&password).expect("hash");

        assert!(verify_password(&password, &hash).is_ok());
        assert!(matches!(
            verify_password(&Password::new("password124".to_string()), &hash),
            Err(PasswordError::Mismatch)
        ));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let password = Password::new("password123".to_string());
        let a = hash_password(&password).expect("hash");
        let b = hash_password(&password).expect("hash");

        assert_ne!(a.as_str(), b.as_str());
        assert!(verify_password(&password, &a).is_ok());
        assert!(verify_password(&password, &b).is_ok());
    }

    #[test]
    fn malformed_hash_is_rejected() {
        let result = verify_password(
            &Password::new("password123".to_string()),
            &PasswordHashString::new("not-a-hash".to_string()),
        );
        assert!(matches!(result, Err(PasswordError::MalformedHash)));
    }

    #[test]
    fn dummy_verification_always_mismatches() {
        for candidate in ["password123", ""] {
            assert!(matches!(
                verify_password_against_dummy(&Password::new(candidate.to_string())),
                PasswordError::Mismatch
            ));
        }
        assert!(DUMMY_HASH
            .get()
            .and_then(Option::as_ref)
            .is_some_and(|h| h.as_str().starts_with("$argon2id$")));
    }

    #[test]
    fn debug_output_is_redacted() {
        let password = Password::new("hunter2hunter2".to_string());
        assert!(!format!("{:?}", password).contains("hunter2"));
    }
}
