//! Password hashing
//!
//! The hashing collaborator is a black box to the rest of the platform:
//! `hash(secret) -> digest` and `verify(secret, digest) -> bool`. The
//! default implementation is Argon2id with PHC-format digests and an
//! optional pepper prepended to the secret.
//!
//! Unit tests in this crate build Argon2 with reduced parameters; every
//! other build uses the library defaults (19 MiB, 2 iterations).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::Argon2;

use crate::error::{TenancyError, TenancyResult};

/// Black-box password hashing capability.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext secret.
    fn hash(&self, secret: &str) -> TenancyResult<String>;

    /// Check a plaintext secret against a stored digest.
    ///
    /// A mismatch is `Ok(false)`; a malformed digest is an error.
    fn verify(&self, secret: &str, digest: &str) -> TenancyResult<bool>;
}

/// Argon2id password hasher.
#[derive(Clone, Default)]
pub struct Argon2PasswordHasher {
    pepper: Option<String>,
}

impl std::fmt::Debug for Argon2PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argon2PasswordHasher")
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Argon2PasswordHasher {
    /// Create a hasher without a pepper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hasher that prepends `pepper` to every secret.
    ///
    /// Digests produced with a pepper only verify with the same pepper.
    pub fn with_pepper(pepper: Option<String>) -> Self {
        Self {
            pepper: pepper.filter(|p| !p.is_empty()),
        }
    }

    fn peppered(&self, secret: &str) -> String {
        match &self.pepper {
            Some(pepper) => format!("{pepper}{secret}"),
            None => secret.to_string(),
        }
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, secret: &str) -> TenancyResult<String> {
        use argon2::PasswordHasher as _;

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = argon2_instance()?;
        argon2
            .hash_password(self.peppered(secret).as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|e| TenancyError::Internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, secret: &str, digest: &str) -> TenancyResult<bool> {
        use argon2::PasswordVerifier as _;

        let parsed = PasswordHash::new(digest)
            .map_err(|e| TenancyError::Internal(format!("invalid password digest: {e}")))?;

        // Parameters are read from the digest itself.
        match Argon2::default().verify_password(self.peppered(secret).as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(TenancyError::Internal(format!("password verification failed: {e}"))),
        }
    }
}

#[cfg(not(test))]
fn argon2_instance() -> TenancyResult<Argon2<'static>> {
    Ok(Argon2::default())
}

#[cfg(test)]
fn argon2_instance() -> TenancyResult<Argon2<'static>> {
    use argon2::{Algorithm, Params, Version};

    // 1 MiB, 1 iteration
    let params = Params::new(1024, 1, 1, None)
        .map_err(|e| TenancyError::Configuration(format!("argon2 params: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}
