//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PURCHASE_MODE` - `account` (login + item grant) or `anonymous`
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 64 chars, high entropy)
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` / `PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL used in payment callbacks (default: `http://localhost:<port>`)
//! - `STRIPE_API_BASE` - Stripe endpoint (default: `https://api.stripe.com`)
//! - `CHECKOUT_CURRENCY` - ISO currency code (default: usd)
//! - `PAYMENT_TIMEOUT_SECS` - Payment request timeout (default: 30)
//! - `STRIPE_VERIFY_PAYMENTS` - Verify the checkout session on return (default: false)
//! - `GRANT_FAILURE_POLICY` - `open` or `closed` (default: open)
//! - `CATALOG_BACKEND` - `sqlite` or `file` (default: sqlite)
//! - `CATALOG_DATABASE_URL` - `SQLite` URL (default: `sqlite://data/items.db?mode=rwc`)
//! - `CATALOG_FILE` - Flat-file catalog (default: data/items.json)
//! - `CATALOG_SEED_FILE` - One-time seed for an empty `SQLite` catalog (default: data/items.json)
//! - `PURCHASE_LOG_FILE` - Purchase log for the file backend (default: data/purchases.jsonl)
//! - `GAME_DATABASE_URL` - Game `MySQL` URL, or the individual settings below
//! - `DB_HOST`, `DB_USER`, `DB_PASSWORD`, `DB_PORT`, `DB_NAME` - Game `MySQL` settings
//!   (defaults: localhost, root, empty, 3306, none)
//! - `ACCOUNT_PASSWORD_SCHEME` - `legacy-md5` or `argon2` (default: legacy-md5)
//! - `ADMIN_PASSWORD_HASH` - Argon2 PHC hash of the admin password
//! - `ADMIN_PASSWORD` - Plain admin password, hashed at startup (default: admin)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use ishop_core::{GrantFailurePolicy, PurchaseMode};

use crate::accounts::PasswordScheme;

const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which catalog (and purchase ledger) backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogBackend {
    /// `items` and `purchases` tables in a `SQLite` database.
    #[default]
    Sqlite,
    /// JSON document catalog and JSON-lines purchase log.
    File,
}

impl std::str::FromStr for CatalogBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "file" => Ok(Self::File),
            _ => Err(format!("invalid catalog backend: {s} (expected sqlite or file)")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Account or anonymous purchasing
    pub purchase_mode: PurchaseMode,
    /// How an unapplied grant is shown to the buyer
    pub grant_failure_policy: GrantFailurePolicy,
    /// Checkout settings
    pub checkout: CheckoutConfig,
    /// Stripe API configuration
    pub stripe: StripeConfig,
    /// Catalog and purchase ledger storage
    pub catalog: CatalogConfig,
    /// External game database (account mode)
    pub game_db: GameDatabaseConfig,
    /// Encoding of stored game account passwords
    pub account_password_scheme: PasswordScheme,
    /// Admin panel credential
    pub admin: AdminConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Checkout behaviour.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Lowercase ISO currency code for every line item
    pub currency: String,
    /// Retrieve and check the checkout session on the success callback
    pub verify_payments: bool,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact the secret key.
#[derive(Clone)]
pub struct StripeConfig {
    /// API secret key
    pub secret_key: SecretString,
    /// API base URL
    pub api_base: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Catalog storage configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub backend: CatalogBackend,
    /// `SQLite` URL for the catalog and ledger tables
    pub database_url: String,
    /// JSON document for the file backend
    pub file: PathBuf,
    /// Seed document imported into an empty `SQLite` catalog
    pub seed_file: PathBuf,
    /// JSON-lines purchase log for the file backend
    pub purchase_log: PathBuf,
}

/// External game database connection settings.
///
/// Implements `Debug` manually to redact the URL and password.
#[derive(Clone)]
pub struct GameDatabaseConfig {
    /// Full connection URL; takes precedence over the individual settings
    pub url: Option<SecretString>,
    pub host: String,
    pub user: String,
    pub password: SecretString,
    pub port: u16,
    /// Default schema. Queries use qualified `account.` / `player.` names.
    pub database: Option<String>,
}

impl std::fmt::Debug for GameDatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameDatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Admin credential source.
#[derive(Clone, Default)]
pub struct AdminConfig {
    /// Argon2 PHC hash
    pub password_hash: Option<SecretString>,
    /// Plain password, hashed at startup
    pub password: Option<SecretString>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("password_hash", &self.password_hash.as_ref().map(|_| "[REDACTED]"))
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Variable source. The process environment in production, a map in tests.
struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };

        let host = env.parse_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port: u16 = match env.optional("STOREFRONT_PORT") {
            Some(_) => env.parse_or("STOREFRONT_PORT", "3000")?,
            None => env.parse_or("PORT", "3000")?,
        };
        let base_url = env
            .or_default("STOREFRONT_BASE_URL", &format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;

        let session_secret = env.validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let purchase_mode = env.parse_required("PURCHASE_MODE")?;
        let grant_failure_policy = env.parse_or("GRANT_FAILURE_POLICY", "open")?;

        let checkout = CheckoutConfig {
            currency: env.or_default("CHECKOUT_CURRENCY", "usd").to_ascii_lowercase(),
            verify_payments: env.parse_bool("STRIPE_VERIFY_PAYMENTS", false)?,
        };

        let stripe = StripeConfig {
            secret_key: env.validated_secret("STRIPE_SECRET_KEY")?,
            api_base: env.or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            timeout: Duration::from_secs(env.parse_or("PAYMENT_TIMEOUT_SECS", "30")?),
        };

        let catalog = CatalogConfig {
            backend: env.parse_or("CATALOG_BACKEND", "sqlite")?,
            database_url: env.or_default("CATALOG_DATABASE_URL", "sqlite://data/items.db?mode=rwc"),
            file: env.or_default("CATALOG_FILE", "data/items.json").into(),
            seed_file: env.or_default("CATALOG_SEED_FILE", "data/items.json").into(),
            purchase_log: env.or_default("PURCHASE_LOG_FILE", "data/purchases.jsonl").into(),
        };

        let game_db = GameDatabaseConfig {
            url: env.optional("GAME_DATABASE_URL").map(SecretString::from),
            host: env.or_default("DB_HOST", "localhost"),
            user: env.or_default("DB_USER", "root"),
            password: SecretString::from(env.or_default("DB_PASSWORD", "")),
            port: env.parse_or("DB_PORT", "3306")?,
            database: env.optional("DB_NAME"),
        };

        let account_password_scheme = env.parse_or("ACCOUNT_PASSWORD_SCHEME", "legacy-md5")?;

        let admin = AdminConfig {
            password_hash: env.optional("ADMIN_PASSWORD_HASH").map(SecretString::from),
            password: env.optional("ADMIN_PASSWORD").map(SecretString::from),
        };

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            purchase_mode,
            grant_failure_policy,
            checkout,
            stripe,
            catalog,
            game_db,
            account_password_scheme,
            admin,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

impl Env<'_> {
    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a required variable.
    fn parse_required<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        Self::parse_value(key, &self.required(key)?)
    }

    /// Parse a variable, falling back to `default`.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        Self::parse_value(key, &self.or_default(key, default))
    }

    /// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
    fn parse_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(key) else {
            return Ok(default);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got {other:?}"),
            )),
        }
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
