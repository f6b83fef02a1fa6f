//! Authentication extractors.
//!
//! Game account login and the admin flag live side by side in the session.
//! Each extractor reads only its own key. Account routes take
//! [`OptionalAccount`] because the checkout service decides whether a login
//! is required for the configured purchase mode.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentAccount, session_keys};

/// Rejection for routes that need the admin flag.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the admin panel, which shows its own login form.
    RedirectToAdmin,
    /// No session layer is installed.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToAdmin => Redirect::to("/admin").into_response(),
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

async fn current_account(session: &Session) -> Option<CurrentAccount> {
    session
        .get::<CurrentAccount>(session_keys::ACCOUNT)
        .await
        .ok()
        .flatten()
}

async fn admin_flag(session: &Session) -> bool {
    session
        .get::<bool>(session_keys::ADMIN_AUTHENTICATED)
        .await
        .ok()
        .flatten()
        .unwrap_or(false)
}

/// Extractor that optionally gets the logged-in game account.
pub struct OptionalAccount(pub Option<CurrentAccount>);

impl<S> FromRequestParts<S> for OptionalAccount
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let account = match parts.extensions.get::<Session>() {
            Some(session) => current_account(session).await,
            None => None,
        };

        Ok(Self(account))
    }
}

/// Extractor that requires the admin flag.
///
/// Redirects to `/admin` otherwise.
pub struct RequireAdmin;

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        if admin_flag(session).await {
            Ok(Self)
        } else {
            Err(AuthRejection::RedirectToAdmin)
        }
    }
}

/// Extractor for the admin flag, never rejecting.
pub struct AdminFlag(pub bool);

impl<S> FromRequestParts<S> for AdminFlag
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let flag = match parts.extensions.get::<Session>() {
            Some(session) => admin_flag(session).await,
            None => false,
        };

        Ok(Self(flag))
    }
}

/// Store the logged-in account, rotating the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_account(
    session: &Session,
    account: &CurrentAccount,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::ACCOUNT, account).await
}

/// Set the admin flag, rotating the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::ADMIN_AUTHENTICATED, true).await
}

/// Drop everything in the session (logout).
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
