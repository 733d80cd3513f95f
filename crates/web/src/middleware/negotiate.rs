//! Content negotiation for error responses
//!
//! 404 and 500 responses are rendered as the HTML error page unless the
//! client strictly prefers `application/json` over `text/html`, in which
//! case they carry the JSON error envelope tagged with the request id.

use crate::views;
use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use tower_http::request_id::RequestId;
use synthese_common::errors::{ErrorCode, ErrorDetails, ErrorResponse};

/// Whether the client ranks JSON strictly above HTML
///
/// A missing `Accept` header accepts everything, so HTML wins the tie.
pub fn wants_json(headers: &HeaderMap) -> bool {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("*/*");

    quality(accept, "application/json") > quality(accept, "text/html")
}

/// Quality `accept` gives to `mime`, taken from the most specific matching range
pub fn quality(accept: &str, mime: &str) -> f32 {
    let (kind, subtype) = mime.split_once('/').unwrap_or((mime, ""));
    let mut best: Option<(u8, f32)> = None;

    for range in accept.split(',') {
        let mut params = range.split(';');
        let media = params.next().unwrap_or("").trim().to_ascii_lowercase();
        let q = params
            .filter_map(|param| param.split_once('='))
            .filter(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
            .filter_map(|(_, q)| q.trim().parse::<f32>().ok())
            .filter(|q| q.is_finite())
            .last()
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);

        let specificity = match media.split_once('/') {
            Some((k, s)) if k == kind && s == subtype => 2,
            Some((k, "*")) if k == kind => 1,
            Some(("*", "*")) => 0,
            _ => continue,
        };

        if best.map_or(true, |(current, _)| specificity > current) {
            best = Some((specificity, q));
        }
    }

    best.map(|(_, q)| q).unwrap_or(0.0)
}

/// Re-render 404 and 500 responses in the format the client asked for
pub async fn render_errors(request: Request, next: Next) -> Response {
    let json = wants_json(request.headers());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .map(str::to_string);
    let response = next.run(request).await;

    let status = response.status();
    if status != StatusCode::NOT_FOUND && status != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    if json {
        let body = match response.extensions().get::<ErrorDetails>() {
            Some(details) => ErrorResponse {
                error: details.clone(),
            },
            None => {
                let code = if status == StatusCode::NOT_FOUND {
                    ErrorCode::NotFound
                } else {
                    ErrorCode::InternalError
                };
                ErrorResponse::new(code, status.canonical_reason().unwrap_or("Error"))
            }
        };
        return (status, Json(body.with_request_id(request_id))).into_response();
    }

    (status, Html(views::error_page(status))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::HeaderValue, middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    async fn explode() -> &'static str {
        panic!("handler blew up")
    }

    fn panicking_app() -> Router {
        Router::new()
            .route("/explode", get(explode))
            .layer(CatchPanicLayer::new())
            .layer(from_fn(render_errors))
    }

    async fn request(accept: &'static str) -> Response {
        let request = axum::http::Request::builder()
            .uri("/explode")
            .header(header::ACCEPT, accept)
            .body(Body::empty())
            .unwrap();
        panicking_app().oneshot(request).await.unwrap()
    }

    fn accepting(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_quality_prefers_specific_range() {
        let accept = "text/*;q=0.3, text/html;q=0.7, */*;q=0.5";
        assert_eq!(quality(accept, "text/html"), 0.7);
        assert_eq!(quality(accept, "text/plain"), 0.3);
        assert_eq!(quality(accept, "application/json"), 0.5);
        assert_eq!(quality("image/png", "text/html"), 0.0);
    }

    #[test]
    fn test_quality_parameter_name_is_case_insensitive() {
        assert_eq!(quality("text/html;Q=0.1", "text/html"), 0.1);
        assert!(wants_json(&accepting("text/html;Q=0.1, application/json")));
    }

    #[test]
    fn test_non_finite_quality_is_ignored() {
        assert_eq!(quality("application/json;q=NaN", "application/json"), 1.0);
        assert_eq!(quality("application/json;q=inf", "application/json"), 1.0);
        assert!(!wants_json(&accepting("application/json;q=NaN, text/html")));
    }

    #[tokio::test]
    async fn test_panic_renders_json_envelope() {
        let response = request("application/json").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "Internal Server Error");
    }

    #[tokio::test]
    async fn test_panic_renders_error_page() {
        let response = request("text/html").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("An unexpected error has occurred"));
    }

    #[test]
    fn test_wants_json() {
        assert!(wants_json(&accepting("application/json")));
        assert!(wants_json(&accepting("application/json, text/html;q=0.9")));
        assert!(wants_json(&accepting("text/html;q=0.1, application/*")));
    }

    #[test]
    fn test_html_wins_ties_and_defaults() {
        assert!(!wants_json(&HeaderMap::new()));
        assert!(!wants_json(&accepting("*/*")));
        assert!(!wants_json(&accepting("text/html, application/json")));
        assert!(!wants_json(&accepting(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
        )));
    }
}
