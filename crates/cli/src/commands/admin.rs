//! Admin credential commands.
//!
//! # Usage
//!
//! ```bash
//! ishop-cli hash-password --password 'correct horse battery staple'
//! echo -n 'correct horse battery staple' | ishop-cli hash-password
//! ```
//!
//! Put the printed PHC string into `ADMIN_PASSWORD_HASH`.

use std::io::BufRead;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use ishop_storefront::accounts::password;

/// Errors that can occur while hashing.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Password cannot be empty")]
    EmptyPassword,

    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to hash password")]
    Hash,
}

/// Hash `password` (or the first line of stdin) and print the PHC string.
///
/// # Errors
///
/// Returns `AdminError` if no password is given or hashing fails.
pub fn hash_password(password: Option<String>) -> Result<(), AdminError> {
    let password = match password {
        Some(password) => SecretString::from(password),
        None => {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            SecretString::from(line.trim_end_matches(['\r', '\n']).to_owned())
        }
    };

    let hash = hash_secret(&password)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{hash}");
    }
    Ok(())
}

fn hash_secret(password: &SecretString) -> Result<String, AdminError> {
    if password.expose_secret().is_empty() {
        return Err(AdminError::EmptyPassword);
    }
    password::hash_password(password.expose_secret()).map_err(|_| AdminError::Hash)
}
