//! One-shot messages carried across a redirect
//!
//! A redirect stores its messages in a short-lived cookie (JSON, hex
//! encoded); the next rendered page shows them and clears the cookie.

use crate::middleware::session::{cookie_value, header_value};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Redirect, Response},
};
use std::convert::Infallible;
use synthese_common::errors::Result;

pub const FLASH_COOKIE: &str = "flash";

/// Messages to show on the page being rendered
#[derive(Debug, Default)]
pub struct Flash {
    messages: Vec<String>,
    from_cookie: bool,
}

impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let messages = cookie_value(&parts.headers, FLASH_COOKIE)
            .map(decode)
            .unwrap_or_default();
        Ok(Self {
            from_cookie: !messages.is_empty(),
            messages,
        })
    }
}

impl Flash {
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Show `message` on the page about to be rendered
    pub fn now(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Wrap a rendered page, dropping the consumed cookie
    pub fn render(self, status: StatusCode, html: String) -> Response {
        let mut response = (status, Html(html)).into_response();
        if self.from_cookie {
            response
                .headers_mut()
                .append(header::SET_COOKIE, clear_cookie());
        }
        response
    }
}

/// Redirect to `to` and show `message` on the page it lands on
pub fn redirect(to: &str, message: &str) -> Result<Response> {
    let cookie = set_cookie(&[message.to_string()])?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(to),
    )
        .into_response())
}

pub fn set_cookie(messages: &[String]) -> Result<HeaderValue> {
    header_value(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE,
        encode(messages)?
    ))
}

pub fn clear_cookie() -> HeaderValue {
    HeaderValue::from_static("flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")
}

fn encode(messages: &[String]) -> Result<String> {
    Ok(hex::encode(serde_json::to_vec(messages)?))
}

/// Tampered or truncated cookies decode to nothing
fn decode(value: &str) -> Vec<String> {
    hex::decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(cookie: &str) -> Flash {
        let (mut parts, _) = Request::builder()
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        Flash::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_redirect_then_extract() {
        let response = redirect("/login", "Passwords do not match, héhé").unwrap();
        assert_eq!(response.headers()[header::LOCATION], "/login");

        let set = response.headers()[header::SET_COOKIE].to_str().unwrap();
        let pair = set.split(';').next().unwrap();

        let flash = extract(pair).await;
        assert_eq!(flash.messages(), ["Passwords do not match, héhé".to_string()]);
    }

    #[tokio::test]
    async fn test_garbage_cookie_is_ignored() {
        let flash = extract("flash=zz-not-hex").await;
        assert!(flash.messages().is_empty());

        let response = flash.render(StatusCode::OK, String::new());
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_render_clears_consumed_cookie() {
        let cookie = format!("flash={}", encode(&["hello".to_string()]).unwrap());
        let mut flash = extract(&cookie).await;
        flash.now("and now");
        assert_eq!(flash.messages().len(), 2);

        let response = flash.render(StatusCode::OK, "<p>page</p>".to_string());
        let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cleared.contains("Max-Age=0"));
    }
}
