//! Checkout route handlers.
//!
//! `/buy/{id}` starts a hosted checkout; `/success/{id}` is the provider's
//! success callback, which records the purchase and grants the item.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use ishop_core::{GrantFailurePolicy, ItemId};
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::error::{AppError, Result};
use crate::middleware::OptionalAccount;
use crate::services::{CheckoutError, Confirmation};
use crate::state::AppState;

/// Query parameters on the success callback.
#[derive(Debug, Default, Deserialize)]
pub struct SuccessQuery {
    /// Filled in by the provider when payment verification is enabled.
    pub session_id: Option<String>,
}

/// Start a checkout for an item and redirect to the provider.
///
/// Unknown items redirect home; a missing login (account mode) redirects
/// to `/login`.
#[instrument(skip(state, account))]
pub async fn buy(
    State(state): State<AppState>,
    OptionalAccount(account): OptionalAccount,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let Ok(item_id) = ItemId::parse(&id) else {
        return Ok(Redirect::to("/"));
    };

    match state.checkout().initiate(account.as_ref(), &item_id).await {
        Ok(redirect) => Ok(Redirect::to(&redirect.url)),
        Err(CheckoutError::Unauthorized) => Ok(Redirect::to("/login")),
        Err(CheckoutError::NotFound(_)) => Ok(Redirect::to("/")),
        Err(e) => Err(e.into()),
    }
}

fn confirmation_target(confirmation: &Confirmation, policy: GrantFailurePolicy) -> &'static str {
    match policy {
        GrantFailurePolicy::Closed if !confirmation.grant.is_applied() => "/?grant_failed=true",
        _ => "/?success=true",
    }
}

/// Handle the provider's success callback.
///
/// Anonymous mode credits nothing and just shows the success flag.
#[instrument(skip(state, account, query))]
pub async fn success(
    State(state): State<AppState>,
    OptionalAccount(account): OptionalAccount,
    Path(id): Path<String>,
    Query(query): Query<SuccessQuery>,
) -> Result<Redirect> {
    let Ok(item_id) = ItemId::parse(&id) else {
        return Ok(Redirect::to("/?success=true"));
    };

    let result = state
        .checkout()
        .confirm_success(account.as_ref(), &item_id, query.session_id.as_deref())
        .await;

    match result {
        Ok(confirmation) => Ok(Redirect::to(confirmation_target(
            &confirmation,
            state.grant_failure_policy(),
        ))),
        Err(CheckoutError::Unsupported(_) | CheckoutError::NotFound(_)) => {
            Ok(Redirect::to("/?success=true"))
        }
        Err(CheckoutError::Unauthorized) => Ok(Redirect::to("/login")),
        Err(CheckoutError::PaymentNotVerified(reason)) => {
            warn!(reason = %reason, "Success callback without verified payment");
            Err(AppError::BadRequest("Payment could not be verified".to_owned()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use ishop_core::{CharacterId, PurchaseId};

    use super::*;
    use crate::catalog::test_support::item;
    use crate::services::GrantStatus;

    fn confirmation(grant: GrantStatus) -> Confirmation {
        Confirmation {
            purchase_id: PurchaseId::generate(),
            item: item("sword1", "Sword", "9.99"),
            grant,
        }
    }

    #[test]
    fn test_open_policy_always_reports_success() {
        for grant in [
            GrantStatus::Applied { character_id: CharacterId::new(1) },
            GrantStatus::NoCharacter,
            GrantStatus::Failed("db down".to_owned()),
        ] {
            assert_eq!(
                confirmation_target(&confirmation(grant), GrantFailurePolicy::Open),
                "/?success=true"
            );
        }
    }

    #[test]
    fn test_closed_policy_reports_failed_grant() {
        let applied = confirmation(GrantStatus::Applied { character_id: CharacterId::new(1) });
        assert_eq!(
            confirmation_target(&applied, GrantFailurePolicy::Closed),
            "/?success=true"
        );
        assert_eq!(
            confirmation_target(&confirmation(GrantStatus::AlreadyApplied), GrantFailurePolicy::Closed),
            "/?success=true"
        );
        assert_eq!(
            confirmation_target(&confirmation(GrantStatus::NoCharacter), GrantFailurePolicy::Closed),
            "/?grant_failed=true"
        );
    }
}
