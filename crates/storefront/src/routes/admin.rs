//! Admin catalog management.
//!
//! A single shared password unlocks the panel for the session. Mutations
//! without the admin flag redirect to `/admin`, which shows the login form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use ishop_core::{ItemId, Price};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::catalog::{CatalogError, Item};
use crate::error::Result;
use crate::middleware::{AdminFlag, RequireAdmin, set_admin};
use crate::routes::home::ItemView;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Admin login form data.
#[derive(Debug, Deserialize)]
pub struct AdminLoginForm {
    pub password: String,
}

/// New item form data.
#[derive(Debug, Deserialize)]
pub struct AddItemForm {
    pub id: String,
    pub name: String,
    pub price: String,
}

/// Edit item form data.
#[derive(Debug, Deserialize)]
pub struct EditItemForm {
    pub name: String,
    pub price: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Admin login template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct AdminLoginTemplate {
    pub error: Option<String>,
}

/// Catalog management template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminTemplate {
    pub items: Vec<ItemView>,
    pub error: Option<String>,
}

async fn render_panel(state: &AppState, error: Option<String>) -> Result<AdminTemplate> {
    let items = state.catalog().list().await?;
    Ok(AdminTemplate {
        items: items.iter().map(ItemView::from).collect(),
        error,
    })
}

fn parse_item(form: &AddItemForm) -> std::result::Result<Item, String> {
    let id = ItemId::parse(&form.id).map_err(|e| format!("Invalid id: {e}"))?;
    let (name, price) = parse_fields(&form.name, &form.price)?;
    Ok(Item { id, name, price })
}

fn parse_fields(name: &str, price: &str) -> std::result::Result<(String, Price), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_owned());
    }
    let price = Price::parse(price).map_err(|e| format!("Invalid price: {e}"))?;
    Ok((name.to_owned(), price))
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the catalog table, or the login form without the admin flag.
pub async fn index(State(state): State<AppState>, AdminFlag(admin): AdminFlag) -> Result<Response> {
    if !admin {
        return Ok(AdminLoginTemplate { error: None }.into_response());
    }
    Ok(render_panel(&state, None).await?.into_response())
}

/// Check the admin password and set the session flag.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AdminLoginForm>,
) -> Result<Response> {
    if !state.admin().verify(&form.password) {
        warn!("Admin login rejected");
        return Ok(AdminLoginTemplate {
            error: Some("Invalid password".to_owned()),
        }
        .into_response());
    }

    set_admin(&session).await?;
    info!("Admin logged in");
    Ok(Redirect::to("/admin").into_response())
}

/// Create an item.
#[instrument(skip(state, _admin, form), fields(id = %form.id))]
pub async fn add(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Form(form): Form<AddItemForm>,
) -> Result<Response> {
    let item = match parse_item(&form) {
        Ok(item) => item,
        Err(message) => return Ok(render_panel(&state, Some(message)).await?.into_response()),
    };

    match state.catalog().create(&item).await {
        Ok(()) => {
            info!(id = %item.id, "Item created");
            Ok(Redirect::to("/admin").into_response())
        }
        Err(CatalogError::AlreadyExists(_)) => Ok(render_panel(
            &state,
            Some("Item already exists".to_owned()),
        )
        .await?
        .into_response()),
        Err(e) => Err(e.into()),
    }
}

/// Update an item's name and price. Unknown ids are ignored.
#[instrument(skip(state, _admin, form))]
pub async fn edit(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<EditItemForm>,
) -> Result<Response> {
    let Ok(item_id) = ItemId::parse(&id) else {
        return Ok(Redirect::to("/admin").into_response());
    };
    let (name, price) = match parse_fields(&form.name, &form.price) {
        Ok(fields) => fields,
        Err(message) => return Ok(render_panel(&state, Some(message)).await?.into_response()),
    };

    match state.catalog().update(&item_id, &name, price).await {
        Ok(()) => info!(id = %item_id, "Item updated"),
        Err(CatalogError::NotFound(_)) => info!(id = %item_id, "Edit of unknown item ignored"),
        Err(e) => return Err(e.into()),
    }
    Ok(Redirect::to("/admin").into_response())
}

/// Delete an item. Deleting an unknown id succeeds.
#[instrument(skip(state, _admin))]
pub async fn delete(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Redirect> {
    if let Ok(item_id) = ItemId::parse(&id) {
        state.catalog().delete(&item_id).await?;
        info!(id = %item_id, "Item deleted");
    }
    Ok(Redirect::to("/admin"))
}
