//! Session-related types.
//!
//! A session holds two independent pieces of state: the logged-in game
//! account and the admin flag. Logging into one never touches the other.

pub use crate::accounts::AccountIdentity as CurrentAccount;

/// Session keys for authentication data.
pub mod keys {
    /// Key for the logged-in game account.
    pub const ACCOUNT: &str = "account";

    /// Key for the admin panel flag.
    pub const ADMIN_AUTHENTICATED: &str = "authenticated";
}
