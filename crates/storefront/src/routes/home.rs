//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use crate::catalog::Item;
use crate::error::Result;
use crate::middleware::OptionalAccount;
use crate::models::CurrentAccount;
use crate::state::AppState;

/// Item display data for templates.
#[derive(Debug, Clone)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    /// Formatted with two decimals.
    pub price: String,
    /// Path segment with the id percent-encoded.
    pub path_id: String,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            price: item.price.to_string(),
            path_id: urlencoding::encode(item.id.as_str()).into_owned(),
        }
    }
}

/// Flash flags set by checkout redirects.
#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    pub success: Option<String>,
    pub canceled: Option<String>,
    pub grant_failed: Option<String>,
}

fn flag(value: Option<&String>) -> bool {
    value.is_some_and(|v| v == "true")
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub items: Vec<ItemView>,
    pub account: Option<CurrentAccount>,
    /// Show the login link (account purchase mode).
    pub accounts_enabled: bool,
    pub success: bool,
    pub canceled: bool,
    pub grant_failed: bool,
}

/// Display the catalog.
#[instrument(skip(state, account, query))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAccount(account): OptionalAccount,
    Query(query): Query<FlashQuery>,
) -> Result<HomeTemplate> {
    let items = state.catalog().list().await?;

    Ok(HomeTemplate {
        items: items.iter().map(ItemView::from).collect(),
        account,
        accounts_enabled: state.purchase_mode().requires_account(),
        success: flag(query.success.as_ref()),
        canceled: flag(query.canceled.as_ref()),
        grant_failed: flag(query.grant_failed.as_ref()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::item;

    #[test]
    fn test_item_view_encodes_path() {
        let view = ItemView::from(&item("Mantel des Drachen", "Cloak", "12.5"));
        assert_eq!(view.path_id, "Mantel%20des%20Drachen");
        assert_eq!(view.price, "12.50");
    }

    #[test]
    fn test_flag_only_accepts_true() {
        assert!(flag(Some(&"true".to_owned())));
        assert!(!flag(Some(&"1".to_owned())));
        assert!(!flag(None));
    }
}
