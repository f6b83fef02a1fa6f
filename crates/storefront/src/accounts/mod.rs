//! Game accounts: credential checks and item grants.
//!
//! Only used in account purchase mode. The game database is external and
//! owned by the game server, so this module reads accounts and characters
//! and only ever inserts inventory rows.

mod game_db;
pub mod password;

pub use game_db::GameAccountStore;
pub use password::PasswordScheme;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ishop_core::{AccountId, CharacterId, ItemId};

/// An authenticated game account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub id: AccountId,
    pub login: String,
}

/// Result of a grant attempt that reached the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// A `MALL` inventory row was inserted for this character.
    Granted { character_id: CharacterId },
    /// The account has no character; nothing was inserted.
    NoCharacter,
}

/// Errors from the account store.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("game database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The item id cannot be used as a game `vnum`.
    #[error("item {0} is not a valid game item number")]
    InvalidItemNumber(ItemId),
}

/// Access to game accounts and character inventories.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Check a login/password pair. Unknown logins and wrong passwords both
    /// yield `None`.
    async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<AccountIdentity>, AccountError>;

    /// Give one unit of `item_id` to the account's first character.
    async fn grant_item(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
    ) -> Result<GrantOutcome, AccountError>;
}
