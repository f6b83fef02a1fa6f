//! Session middleware configuration.
//!
//! Sessions are kept in memory and identified by a signed cookie; they do
//! not survive a restart.

use secrecy::ExposeSecret;
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ishop_session";

/// Session expiry time in seconds (1 day).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Error building the session layer.
#[derive(Debug, thiserror::Error)]
#[error("session secret cannot be used as a signing key: {0}")]
pub struct SessionKeyError(String);

/// Create the session layer with an in-memory store and signed cookies.
///
/// # Arguments
///
/// * `secret` - Signing secret, at least 64 bytes
/// * `base_url` - Public URL; `https` enables the `Secure` cookie flag
///
/// # Errors
///
/// Returns `SessionKeyError` if the secret is too short for a signing key.
pub fn create_session_layer(
    secret: &secrecy::SecretString,
    base_url: &str,
) -> Result<SessionManagerLayer<MemoryStore, tower_sessions::service::SignedCookie>, SessionKeyError>
{
    let key = Key::try_from(secret.expose_secret().as_bytes())
        .map_err(|e| SessionKeyError(e.to_string()))?;

    let is_secure = base_url.starts_with("https://");

    Ok(SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
