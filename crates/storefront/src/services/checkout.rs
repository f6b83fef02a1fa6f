//! Checkout orchestration.
//!
//! `initiate` turns a catalog item into a hosted checkout session.
//! `confirm_success` handles the buyer's return: it records the purchase,
//! then grants the item to the buyer's game account.
//!
//! With payment verification on, a checkout session is credited once. The
//! session must name the returning account as its buyer, and a second
//! return with the same session answers from the ledger without granting.
//!
//! ```text
//! Requested -> ProviderSessionCreated -> Redirected -> (paid) -> Confirmed -> Granted
//!     \______________ Failed (any step) ______________/
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use ishop_core::{CharacterId, ItemId, PriceError, PurchaseId, PurchaseMode, PurchaseStatus};

use crate::accounts::{AccountIdentity, AccountStore, GrantOutcome};
use crate::catalog::{CatalogError, CatalogStore, Item};
use crate::payments::{CheckoutRequest, PaymentError, PaymentGateway};
use crate::purchases::{LedgerError, NewPurchase, Purchase, PurchaseLedger};

/// Placeholder the provider replaces with the session id in the success URL.
const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Errors from checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Buying requires a logged-in account.
    #[error("login required")]
    Unauthorized,

    #[error("item not found: {0}")]
    NotFound(ItemId),

    /// The operation does not exist in the configured purchase mode.
    #[error("not available in {0} purchase mode")]
    Unsupported(PurchaseMode),

    /// The provider does not confirm payment for this item.
    #[error("payment not verified: {0}")]
    PaymentNotVerified(String),

    #[error("price error: {0}")]
    Price(#[from] PriceError),

    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Checkout behaviour fixed at startup.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub mode: PurchaseMode,
    /// Public base URL without trailing slash.
    pub base_url: String,
    pub currency: String,
    /// Check the provider session before recording a purchase.
    pub verify_payments: bool,
}

/// Where to send the buyer to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRedirect {
    pub url: String,
    pub session_id: String,
}

/// What happened when the item was credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantStatus {
    Applied { character_id: CharacterId },
    /// The checkout session was credited by an earlier return.
    AlreadyApplied,
    NoCharacter,
    Failed(String),
}

impl GrantStatus {
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::AlreadyApplied)
    }

    /// Outcome of an earlier return, as recorded in the ledger.
    fn recorded(purchase: &Purchase) -> Self {
        match purchase.status {
            PurchaseStatus::Granted => Self::AlreadyApplied,
            PurchaseStatus::NoCharacter => Self::NoCharacter,
            PurchaseStatus::GrantFailed => Self::Failed(
                purchase
                    .detail
                    .clone()
                    .unwrap_or_else(|| "grant failed".to_owned()),
            ),
            PurchaseStatus::Confirmed => Self::Failed("grant outcome not recorded".to_owned()),
        }
    }
}

/// A recorded purchase and the outcome of its grant.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub purchase_id: PurchaseId,
    pub item: Item,
    pub grant: GrantStatus,
}

/// Checkout orchestrator.
#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<dyn CatalogStore>,
    accounts: Option<Arc<dyn AccountStore>>,
    gateway: Arc<dyn PaymentGateway>,
    ledger: Arc<dyn PurchaseLedger>,
    settings: CheckoutSettings,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        accounts: Option<Arc<dyn AccountStore>>,
        gateway: Arc<dyn PaymentGateway>,
        ledger: Arc<dyn PurchaseLedger>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            catalog,
            accounts,
            gateway,
            ledger,
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    fn success_url(&self, item_id: &ItemId) -> String {
        let base = &self.settings.base_url;
        match self.settings.mode {
            PurchaseMode::Account => {
                let url = format!("{base}/success/{}", urlencoding::encode(item_id.as_str()));
                if self.settings.verify_payments {
                    format!("{url}?session_id={SESSION_ID_PLACEHOLDER}")
                } else {
                    url
                }
            }
            PurchaseMode::Anonymous => format!("{base}/?success=true"),
        }
    }

    /// Create a checkout session for one unit of `item_id`.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` in account mode without an identity
    /// - `NotFound` if the item does not exist (the provider is not called)
    /// - `Payment` if the provider rejects or cannot be reached
    #[instrument(skip(self, identity), fields(item_id = %item_id))]
    pub async fn initiate(
        &self,
        identity: Option<&AccountIdentity>,
        item_id: &ItemId,
    ) -> Result<CheckoutRedirect, CheckoutError> {
        if self.settings.mode.requires_account() && identity.is_none() {
            return Err(CheckoutError::Unauthorized);
        }

        let item = self
            .catalog
            .get(item_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(item_id.clone()))?;

        let request = CheckoutRequest {
            item_id: item.id.clone(),
            product_name: item.name.clone(),
            unit_amount: item.price.minor_units()?,
            quantity: 1,
            currency: self.settings.currency.clone(),
            success_url: self.success_url(&item.id),
            cancel_url: format!("{}/?canceled=true", self.settings.base_url),
            client_reference_id: identity.map(|i| i.id.to_string()),
        };

        let session = self.gateway.create_checkout_session(&request).await?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::MissingRedirect(session.id.clone()))?;

        info!(session_id = %session.id, amount = request.unit_amount, "Checkout session created");
        Ok(CheckoutRedirect {
            url,
            session_id: session.id,
        })
    }

    /// Record a completed checkout and grant the item.
    ///
    /// The purchase is written to the ledger before the grant runs; if that
    /// write fails the grant is not attempted. Grant failures do not fail the
    /// call: they are recorded and reported in [`Confirmation::grant`].
    ///
    /// # Errors
    ///
    /// - `Unsupported` in anonymous mode
    /// - `Unauthorized` without an identity (no grant is attempted)
    /// - `NotFound` if the item no longer exists
    /// - `PaymentNotVerified` when verification is on and the provider
    ///   does not report this item as paid by this account
    /// - `Ledger` if the purchase cannot be recorded
    #[instrument(skip(self, identity, checkout_session_id), fields(item_id = %item_id))]
    pub async fn confirm_success(
        &self,
        identity: Option<&AccountIdentity>,
        item_id: &ItemId,
        checkout_session_id: Option<&str>,
    ) -> Result<Confirmation, CheckoutError> {
        if !self.settings.mode.requires_account() {
            return Err(CheckoutError::Unsupported(self.settings.mode));
        }
        let identity = identity.ok_or(CheckoutError::Unauthorized)?;

        let item = self
            .catalog
            .get(item_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(item_id.clone()))?;

        // Unverified session ids come from the query string and are not kept
        let session_id = if self.settings.verify_payments {
            Some(self.verify_payment(identity, &item, checkout_session_id).await?)
        } else {
            None
        };

        if let Some(session_id) = session_id
            && let Some(existing) = self.ledger.find_by_checkout_session(session_id).await?
        {
            return Self::redeemed(identity, item, &existing);
        }

        let purchase = Purchase::confirmed(NewPurchase {
            account_id: Some(identity.id),
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            amount_minor: item.price.minor_units()?,
            currency: self.settings.currency.clone(),
            checkout_session_id: session_id.map(str::to_owned),
        });
        match self.ledger.record(&purchase).await {
            Ok(()) => {}
            // A concurrent return recorded the same session first
            Err(LedgerError::DuplicateSession(session_id)) => {
                let Some(existing) = self.ledger.find_by_checkout_session(&session_id).await?
                else {
                    return Err(LedgerError::DuplicateSession(session_id).into());
                };
                return Self::redeemed(identity, item, &existing);
            }
            Err(e) => return Err(e.into()),
        }

        let grant = self.grant(identity, &item).await;

        let (status, detail) = match &grant {
            GrantStatus::Applied { .. } | GrantStatus::AlreadyApplied => {
                (PurchaseStatus::Granted, None)
            }
            GrantStatus::NoCharacter => (PurchaseStatus::NoCharacter, None),
            GrantStatus::Failed(reason) => (PurchaseStatus::GrantFailed, Some(reason.as_str())),
        };
        if let Err(e) = self.ledger.mark_status(purchase.id, status, detail).await {
            error!(purchase_id = %purchase.id, error = %e, "Failed to record grant outcome");
        }

        Ok(Confirmation {
            purchase_id: purchase.id,
            item,
            grant,
        })
    }

    /// Answer a repeated return for an already recorded session.
    fn redeemed(
        identity: &AccountIdentity,
        item: Item,
        existing: &Purchase,
    ) -> Result<Confirmation, CheckoutError> {
        if existing.account_id != Some(identity.id) {
            return Err(CheckoutError::PaymentNotVerified(format!(
                "purchase {} belongs to another account",
                existing.id
            )));
        }
        info!(purchase_id = %existing.id, status = %existing.status, "Checkout session already redeemed");
        Ok(Confirmation {
            purchase_id: existing.id,
            item,
            grant: GrantStatus::recorded(existing),
        })
    }

    /// Check that the provider reports `item` as paid by `identity`, and
    /// return the verified session id.
    async fn verify_payment<'a>(
        &self,
        identity: &AccountIdentity,
        item: &Item,
        checkout_session_id: Option<&'a str>,
    ) -> Result<&'a str, CheckoutError> {
        let session_id = checkout_session_id
            .ok_or_else(|| CheckoutError::PaymentNotVerified("missing checkout session id".into()))?;

        let session = match self.gateway.retrieve_checkout_session(session_id).await {
            Ok(session) => session,
            Err(PaymentError::Api { status: 404, .. }) => {
                return Err(CheckoutError::PaymentNotVerified(format!(
                    "unknown checkout session {session_id}"
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if !session.is_paid() {
            return Err(CheckoutError::PaymentNotVerified(format!(
                "session {session_id} is not paid"
            )));
        }
        if session.item_id.as_deref() != Some(item.id.as_str()) {
            return Err(CheckoutError::PaymentNotVerified(format!(
                "session {session_id} is not for item {}",
                item.id
            )));
        }
        if session.client_reference_id.as_deref() != Some(identity.id.to_string().as_str()) {
            return Err(CheckoutError::PaymentNotVerified(format!(
                "session {session_id} was not created for account {}",
                identity.id
            )));
        }
        Ok(session_id)
    }

    async fn grant(&self, identity: &AccountIdentity, item: &Item) -> GrantStatus {
        let Some(accounts) = &self.accounts else {
            warn!("No account store configured; item not granted");
            return GrantStatus::Failed("account store unavailable".to_owned());
        };

        match accounts.grant_item(identity.id, &item.id).await {
            Ok(GrantOutcome::Granted { character_id }) => {
                info!(account_id = %identity.id, character_id = %character_id, "Item granted");
                GrantStatus::Applied { character_id }
            }
            Ok(GrantOutcome::NoCharacter) => {
                warn!(account_id = %identity.id, "Account has no character; item not granted");
                GrantStatus::NoCharacter
            }
            Err(e) => {
                error!(account_id = %identity.id, error = %e, "Item grant failed");
                sentry::capture_error(&e);
                GrantStatus::Failed(e.to_string())
            }
        }
    }
}
