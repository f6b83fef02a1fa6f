//! Admin panel credential.
//!
//! The admin panel has a single shared password. It is held as a hash:
//! either configured directly, or computed with Argon2 at startup from a
//! plain password. A configured hash may be an Argon2 PHC string or a bcrypt
//! hash (`$2a$`, `$2b$`, `$2y$`) carried over from an existing deployment.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;

use crate::accounts::password::{PasswordHashError, hash_password, verify_password};
use crate::config::AdminConfig;

/// Password used when nothing is configured.
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Errors while preparing the admin credential.
#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("ADMIN_PASSWORD_HASH is not a valid Argon2 or bcrypt hash")]
    InvalidHash,

    #[error(transparent)]
    Hash(#[from] PasswordHashError),
}

/// Algorithm of the stored admin hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashKind {
    Argon2,
    Bcrypt,
}

impl HashKind {
    fn detect(hash: &str) -> Self {
        if ["$2a$", "$2b$", "$2y$"].iter().any(|p| hash.starts_with(p)) {
            Self::Bcrypt
        } else {
            Self::Argon2
        }
    }

    fn is_well_formed(self, hash: &str) -> bool {
        match self {
            Self::Argon2 => argon2::password_hash::PasswordHash::new(hash).is_ok(),
            // bcrypt only reports a malformed hash while verifying
            Self::Bcrypt => bcrypt::verify("", hash).is_ok(),
        }
    }
}

/// Verifier for the admin password.
#[derive(Clone)]
pub struct AdminCredentials {
    hash: SecretString,
    kind: HashKind,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("hash", &"[REDACTED]")
            .field("kind", &self.kind)
            .finish()
    }
}

impl AdminCredentials {
    /// Build the verifier from configuration.
    ///
    /// Prefers `password_hash`, then `password`, then the default `admin`
    /// password (with a warning).
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidHash` for a malformed configured hash
    /// and `AdminAuthError::Hash` if hashing the plain password fails.
    pub fn from_config(config: &AdminConfig) -> Result<Self, AdminAuthError> {
        if let Some(hash) = &config.password_hash {
            let kind = HashKind::detect(hash.expose_secret());
            if !kind.is_well_formed(hash.expose_secret()) {
                return Err(AdminAuthError::InvalidHash);
            }
            return Ok(Self {
                hash: hash.clone(),
                kind,
            });
        }

        if let Some(password) = &config.password {
            return Self::from_password(password.expose_secret());
        }

        warn!("No admin password configured; using the default password");
        Self::from_password(DEFAULT_ADMIN_PASSWORD)
    }

    /// Build the verifier from a plain password.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::Hash` if hashing fails.
    pub fn from_password(password: &str) -> Result<Self, AdminAuthError> {
        Ok(Self {
            hash: SecretString::from(hash_password(password)?),
            kind: HashKind::Argon2,
        })
    }

    /// Whether `password` is the admin password.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        match self.kind {
            HashKind::Argon2 => verify_password(password, self.hash.expose_secret()),
            HashKind::Bcrypt => {
                bcrypt::verify(password, self.hash.expose_secret()).unwrap_or(false)
            }
        }
    }
}
