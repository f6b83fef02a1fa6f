//! Locale selection.
//!
//! Translations are loaded client-side; the server only remembers the
//! choice in the `i18next` cookie.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Redirect, Response},
};

use crate::state::AppState;

/// Locale cookie name read by the client-side translation loader.
pub const LOCALE_COOKIE_NAME: &str = "i18next";

/// Locale cookie lifetime (1 year).
const LOCALE_COOKIE_MAX_AGE: u32 = 365 * 24 * 60 * 60;

fn is_valid_locale(lng: &str) -> bool {
    !lng.is_empty()
        && lng.len() <= 16
        && lng
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Where to go back to: the `Referer` if it points at this site, else `/`.
fn back_target(headers: &HeaderMap, base_url: &str) -> String {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|referer| {
            (referer.starts_with('/') && !referer.starts_with("//"))
                || referer.strip_prefix(base_url).is_some_and(|rest| {
                    rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')
                })
        })
        .map_or_else(|| "/".to_owned(), str::to_owned)
}

/// Set the locale cookie and redirect back.
///
/// An invalid locale is ignored.
pub async fn set_locale(
    State(state): State<AppState>,
    Path(lng): Path<String>,
    headers: HeaderMap,
) -> Response {
    let target = back_target(&headers, &state.config().base_url);
    let mut response = Redirect::to(&target).into_response();

    if is_valid_locale(&lng) {
        let cookie =
            format!("{LOCALE_COOKIE_NAME}={lng}; Path=/; Max-Age={LOCALE_COOKIE_MAX_AGE}; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    } else {
        tracing::debug!(lng = %lng, "Ignoring invalid locale");
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn with_referer(referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_str(referer).unwrap());
        headers
    }

    #[test]
    fn test_valid_locales() {
        assert!(is_valid_locale("de"));
        assert!(is_valid_locale("pt-BR"));
        assert!(!is_valid_locale(""));
        assert!(!is_valid_locale("de;Path=/x"));
        assert!(!is_valid_locale(&"x".repeat(17)));
    }

    #[test]
    fn test_back_target_same_site() {
        let base = "https://shop.test";
        assert_eq!(back_target(&with_referer("https://shop.test/admin"), base), "https://shop.test/admin");
        assert_eq!(back_target(&with_referer("/?success=true"), base), "/?success=true");
    }

    #[test]
    fn test_back_target_rejects_foreign() {
        let base = "https://shop.test";
        assert_eq!(back_target(&with_referer("https://evil.test/"), base), "/");
        assert_eq!(back_target(&with_referer("https://shop.test.evil.test/"), base), "/");
        assert_eq!(back_target(&with_referer("//evil.test/"), base), "/");
        assert_eq!(back_target(&HeaderMap::new(), base), "/");
    }
}
