//! Password hashing and verification.
//!
//! Game accounts default to the legacy scheme because the game server
//! writes unsalted MD5 hex digests into `account.account`. That scheme is
//! weak (fast, unsalted, compared in variable time) and is kept only for
//! interoperability. Admin credentials always use Argon2.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use md5::{Digest, Md5};
use thiserror::Error;

/// Failure to produce a password hash.
#[derive(Debug, Error)]
#[error("password hashing failed")]
pub struct PasswordHashError;

/// How stored account passwords are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordScheme {
    /// Hex MD5 digest of the password, compared case-insensitively.
    #[default]
    LegacyMd5,
    /// Argon2 PHC string.
    Argon2,
}

impl PasswordScheme {
    /// Whether `password` matches the `stored` value under this scheme.
    #[must_use]
    pub fn matches(&self, password: &str, stored: &str) -> bool {
        match self {
            Self::LegacyMd5 => md5_hex(password).eq_ignore_ascii_case(stored.trim()),
            Self::Argon2 => verify_password(password, stored),
        }
    }
}

impl std::fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LegacyMd5 => write!(f, "legacy-md5"),
            Self::Argon2 => write!(f, "argon2"),
        }
    }
}

impl std::str::FromStr for PasswordScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy-md5" | "md5" => Ok(Self::LegacyMd5),
            "argon2" => Ok(Self::Argon2),
            _ => Err(format!(
                "invalid password scheme: {s} (expected legacy-md5 or argon2)"
            )),
        }
    }
}

/// Lowercase hex MD5 digest.
fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Hash a password with Argon2 and a random salt.
///
/// # Errors
///
/// Returns `PasswordHashError` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordHashError)
}

/// Verify a password against an Argon2 PHC string.
///
/// A malformed hash never verifies.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
