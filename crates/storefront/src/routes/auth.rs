//! Account login route handlers.
//!
//! Accounts live in the external game database. In anonymous purchase mode
//! there is nothing to log into and these routes send visitors home.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_session, set_current_account};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub login: String,
    pub password: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    /// Submitted login, kept on failure.
    pub login: String,
}

/// Display the login page.
pub async fn login_page(State(state): State<AppState>) -> Response {
    if state.accounts().is_none() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        error: None,
        login: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(login = %form.login))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let Some(accounts) = state.accounts() else {
        return Ok(Redirect::to("/").into_response());
    };

    match accounts.authenticate(&form.login, &form.password).await? {
        Some(identity) => {
            set_current_account(&session, &identity).await?;
            set_sentry_user(&identity.id, &identity.login);
            info!(account_id = %identity.id, "Account logged in");
            Ok(Redirect::to("/").into_response())
        }
        None => {
            info!("Login rejected");
            Ok(LoginTemplate {
                error: Some("Invalid credentials".to_owned()),
                login: form.login,
            }
            .into_response())
        }
    }
}

/// Destroy the session and go home.
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_session(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
