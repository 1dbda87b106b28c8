//! Password hashing.
//!
//! Passwords are stored as Argon2id PHC strings (`$argon2id$v=19$...`), which
//! embed the salt and cost parameters. Verification reads those parameters
//! back from the stored string, so raising the cost later does not break
//! existing accounts.

use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher as _, PasswordVerifier as _};

use crate::error::{AuthError, Result};

/// A well-formed Argon2id hash with the default cost parameters that no
/// account uses. Checked against when the account does not exist, so an
/// unknown email costs the same as a wrong password.
pub const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$P2VPm95xh/Pb5hBbokpHTg$TbheNsNWEk8OKL17u/GYhnLwgo8DCxnrzm0SJ+R/AUM";

/// Argon2id password hasher.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// Hasher with the Argon2id defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `password` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if Argon2 rejects the input.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    /// Check `password` against a stored PHC string.
    ///
    /// A malformed stored hash counts as a mismatch.
    #[must_use]
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if Argon2 fails or the task is cancelled.
    pub async fn hash_async(&self, password: String) -> Result<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(format!("Hashing task failed: {e}")))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Hashing`] if the task is cancelled.
    pub async fn verify_async(&self, password: String, stored: String) -> Result<bool> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| AuthError::Hashing(format!("Verification task failed: {e}")))
    }
}
