//! Profile pages

use super::access_denied;
use crate::flash::{self, Flash};
use crate::forms::{field_error, field_errors, FieldErrors, ProfileForm};
use crate::middleware::session::encode_component;
use crate::middleware::CurrentUser;
use crate::views::{self, Context};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Form,
};
use synthese_common::errors::{AppError, Result};
use validator::Validate;

/// A user's profile, visible to that user only
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(username): Path<String>,
    flash: Flash,
) -> Result<Response> {
    let user = state
        .repo
        .users()
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found("user", &username))?;

    if user.id != current.id {
        tracing::warn!(user_id = current.id, profile = %username, "Profile access denied");
        return Ok(access_denied(&current, flash));
    }

    let html = views::user_profile(&Context::new(Some(&current), flash.messages()), &user);
    Ok(flash.render(StatusCode::OK, html))
}

pub async fn edit_form(CurrentUser(user): CurrentUser, flash: Flash) -> Response {
    let html = views::profile_editor(
        &Context::new(Some(&user), flash.messages()),
        &user.username,
        &user.email,
        &FieldErrors::new(),
    );
    flash.render(StatusCode::OK, html)
}

pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let errors = match form.validate() {
        Err(errors) => field_errors(&errors),
        Ok(()) => match state
            .repo
            .users()
            .update_profile(&user, &form.username, &form.email)
            .await
        {
            Ok(updated) => {
                tracing::info!(user_id = updated.id, "Profile updated");
                return flash::redirect(
                    &format!("/user/{}", encode_component(&updated.username)),
                    "Your profile has been updated",
                );
            }
            Err(AppError::Conflict { field, .. }) => {
                field_error(&field, format!("Please use a different {}.", field))
            }
            Err(e) => return Err(e),
        },
    };

    let html = views::profile_editor(
        &Context::new(Some(&user), flash.messages()),
        &form.username,
        &form.email,
        &errors,
    );
    Ok(flash.render(StatusCode::OK, html))
}
