//! Request handlers

pub mod articles;
pub mod auth;
pub mod health;
pub mod keywords;
pub mod users;

use crate::flash::Flash;
use crate::views::{self, Context};
use axum::{
    http::{StatusCode, Uri},
    response::Response,
};
use synthese_common::{db::models::User, errors::AppError};

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::not_found("page", uri.path())
}

/// The access-denied page, served with 403
pub(crate) fn access_denied(user: &User, flash: Flash) -> Response {
    let html = views::access_denied(&Context::new(Some(user), flash.messages()));
    flash.render(StatusCode::FORBIDDEN, html)
}

/// Numeric id from a path segment; anything else names no resource
pub(crate) fn parse_id(resource_type: &str, raw: &str) -> Result<i32, AppError> {
    raw.parse::<i32>()
        .map_err(|_| AppError::not_found(resource_type, raw))
}
