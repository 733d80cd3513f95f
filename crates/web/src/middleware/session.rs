//! Session gate
//!
//! A login session is a signed session token kept in an HttpOnly cookie.
//! Handlers ask for [`CurrentUser`] when the page needs a logged-in user
//! (anonymous visitors are sent to the login page with a `next` parameter)
//! or [`MaybeUser`] when they only need to know.

use crate::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, Uri},
    response::{IntoResponse, Redirect, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use synthese_common::{
    config::AuthConfig,
    db::models::User,
    errors::{AppError, Result},
};

/// Where visitors land when no usable `next` is given
pub const DEFAULT_LANDING: &str = "/index";

/// Everything but unreserved characters and `/`
const NEXT_PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// The logged-in user; anonymous requests are redirected to the login page
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The logged-in user, if any
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        match session_user(&parts.headers, state).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => {
                tracing::debug!(path = %parts.uri.path(), "Anonymous request to a protected page");
                Err(login_redirect(&parts.uri))
            }
            Err(e) => Err(e.into_response()),
        }
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        session_user(&parts.headers, state)
            .await
            .map(MaybeUser)
            .map_err(IntoResponse::into_response)
    }
}

/// Resolve the session cookie to a user
///
/// A missing, forged, or expired token is anonymous, and so is a token
/// whose user has since been deleted.
async fn session_user(headers: &HeaderMap, state: &AppState) -> Result<Option<User>> {
    let Some(token) = cookie_value(headers, &state.config.auth.cookie_name) else {
        return Ok(None);
    };
    let Some(user_id) = state.tokens.verify_session_token(token) else {
        tracing::debug!("Ignoring invalid session cookie");
        return Ok(None);
    };
    state.repo.users().find_by_id(user_id).await
}

/// Redirect to the login page, remembering the requested path
pub fn login_redirect(uri: &Uri) -> Response {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    Redirect::to(&format!("/login?next={}", encode_component(target))).into_response()
}

/// The post-login destination: `next` when it is a path on this site
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(next) if is_local_path(next) => next.to_string(),
        _ => DEFAULT_LANDING.to_string(),
    }
}

fn is_local_path(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.starts_with("/\\")
        && !next.chars().any(|c| c.is_control())
}

/// Percent-encode a path for use as the `next` query parameter
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NEXT_PARAM).to_string()
}

/// Value of the first cookie called `name`
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// `Set-Cookie` value carrying a session token
///
/// Remembered sessions survive the browser closing; the others are
/// session cookies whose token still expires after `session_ttl_secs`.
pub fn session_cookie(auth: &AuthConfig, token: &str, remember: bool) -> Result<HeaderValue> {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", auth.cookie_name, token);
    if remember {
        cookie.push_str(&format!("; Max-Age={}", auth.remember_ttl_secs));
    }
    if auth.secure_cookies {
        cookie.push_str("; Secure");
    }
    header_value(&cookie)
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(auth: &AuthConfig) -> Result<HeaderValue> {
    header_value(&format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
        auth.cookie_name
    ))
}

pub(crate) fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| AppError::Internal {
        message: format!("Invalid header value: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/article/1")), "/article/1");
        assert_eq!(safe_next(Some("/user_articles_list?x=1")), "/user_articles_list?x=1");
        assert_eq!(safe_next(None), DEFAULT_LANDING);
        assert_eq!(safe_next(Some("")), DEFAULT_LANDING);
        assert_eq!(safe_next(Some("http://evil.example/")), DEFAULT_LANDING);
        assert_eq!(safe_next(Some("//evil.example/")), DEFAULT_LANDING);
        assert_eq!(safe_next(Some("/\\evil.example/")), DEFAULT_LANDING);
        assert_eq!(safe_next(Some("article/1")), DEFAULT_LANDING);
        assert_eq!(safe_next(Some("/index\r\nSet-Cookie: x=1")), DEFAULT_LANDING);
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("/article/1"), "/article/1");
        assert_eq!(encode_component("/x?a=b&c"), "/x%3Fa%3Db%26c");
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(encode_component("/a b#c%"), "/a%20b%23c%25");
        assert_eq!(encode_component("/~u/x-y_z.html"), "/~u/x-y_z.html");
    }

    #[test]
    fn test_login_redirect_keeps_requested_path() {
        let uri: Uri = "/article/1".parse().unwrap();
        let response = login_redirect(&uri);
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers()[header::LOCATION],
            "/login?next=/article/1"
        );
    }

    #[test]
    fn test_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def; flash=00"),
        );
        assert_eq!(cookie_value(&headers, "session"), Some("abc.def"));
        assert_eq!(cookie_value(&headers, "flash"), Some("00"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let auth = AuthConfig::default();

        let remembered = session_cookie(&auth, "tok", true).unwrap();
        let remembered = remembered.to_str().unwrap();
        assert!(remembered.starts_with("session=tok;"));
        assert!(remembered.contains("HttpOnly"));
        assert!(remembered.contains(&format!("Max-Age={}", auth.remember_ttl_secs)));

        let transient = session_cookie(&auth, "tok", false).unwrap();
        assert!(!transient.to_str().unwrap().contains("Max-Age"));

        let cleared = clear_session_cookie(&auth).unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }
}
