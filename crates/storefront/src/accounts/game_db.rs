//! `MySQL` game database access.

use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::{debug, instrument};

use ishop_core::{AccountId, CharacterId, ItemId};

use super::{AccountError, AccountIdentity, AccountStore, GrantOutcome, PasswordScheme};

/// Account store over the game server's `account` and `player` schemas.
#[derive(Clone)]
pub struct GameAccountStore {
    pool: MySqlPool,
    scheme: PasswordScheme,
}

impl GameAccountStore {
    #[must_use]
    pub const fn new(pool: MySqlPool, scheme: PasswordScheme) -> Self {
        Self { pool, scheme }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// Item ids double as game item numbers.
fn vnum(item_id: &ItemId) -> Result<u32, AccountError> {
    item_id
        .as_str()
        .parse()
        .map_err(|_| AccountError::InvalidItemNumber(item_id.clone()))
}

#[async_trait]
impl AccountStore for GameAccountStore {
    #[instrument(skip(self, password))]
    async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<AccountIdentity>, AccountError> {
        let row: Option<(i64, Option<String>)> = sqlx::query_as(
            "SELECT CAST(id AS SIGNED), password FROM account.account WHERE login = ?",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, stored)) = row else {
            debug!("Unknown login");
            return Ok(None);
        };

        if !self.scheme.matches(password, stored.as_deref().unwrap_or_default()) {
            debug!("Password mismatch");
            return Ok(None);
        }

        Ok(Some(AccountIdentity {
            id: AccountId::new(id),
            login: login.to_owned(),
        }))
    }

    #[instrument(skip(self), fields(account_id = %account_id, item_id = %item_id))]
    async fn grant_item(
        &self,
        account_id: AccountId,
        item_id: &ItemId,
    ) -> Result<GrantOutcome, AccountError> {
        let character: Option<i64> = sqlx::query_scalar(
            "SELECT CAST(id AS SIGNED) FROM player.player WHERE account_id = ? LIMIT 1",
        )
        .bind(account_id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        let Some(character_id) = character.map(CharacterId::new) else {
            return Ok(GrantOutcome::NoCharacter);
        };

        let vnum = vnum(item_id)?;

        sqlx::query(
            "INSERT INTO player.item (owner_id, `window`, pos, count, vnum) VALUES (?, 'MALL', 0, 1, ?)",
        )
        .bind(character_id.as_i64())
        .bind(vnum)
        .execute(&self.pool)
        .await?;

        Ok(GrantOutcome::Granted { character_id })
    }
}
