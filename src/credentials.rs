use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

use crate::error::AppError;

// 1. CredentialVerifier Contract
/// CredentialVerifier
///
/// Turns plaintext passwords into opaque stored credentials and checks them again at login.
/// Handlers only see this trait, so tests can swap the real Argon2 implementation for the
/// cheap deterministic mock below.
pub trait CredentialVerifier: Send + Sync {
    /// Produces an opaque, self-describing hash of `plaintext`.
    fn hash(&self, plaintext: &str) -> Result<String, AppError>;

    /// Returns true when `plaintext` matches `stored`. Malformed stored values never match.
    fn verify(&self, plaintext: &str, stored: &str) -> bool;
}

// 2. The Real Implementation (Argon2id)
/// Argon2Verifier
///
/// Argon2id with the crate's default parameters; output is a PHC string carrying salt and params.
#[derive(Clone, Default)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
    }

    fn verify(&self, plaintext: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("stored credential is not a valid PHC string: {}", e);
                false
            }
        }
    }
}

// 3. The Mock Implementation (For Tests)
/// MockCredentialVerifier
///
/// Reversible stand-in used by tests so that registering dozens of users stays fast.
#[derive(Clone, Default)]
pub struct MockCredentialVerifier;

impl MockCredentialVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialVerifier for MockCredentialVerifier {
    fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        Ok(format!("mock${}", plaintext))
    }

    fn verify(&self, plaintext: &str, stored: &str) -> bool {
        stored.strip_prefix("mock$") == Some(plaintext)
    }
}

/// CredentialState
///
/// The shared handle stored in `AppState`.
pub type CredentialState = Arc<dyn CredentialVerifier>;
