//! Login, logout, and password reset

use crate::flash::{self, Flash};
use crate::forms::{field_errors, FieldErrors, LoginForm, ResetPasswordForm, ResetRequestForm};
use crate::middleware::session::{
    clear_session_cookie, encode_component, safe_next, session_cookie, DEFAULT_LANDING,
};
use crate::middleware::MaybeUser;
use crate::views::{self, Context};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use synthese_common::{
    db::models::User,
    errors::{AppError, Result},
    mail::send_password_reset_email,
    metrics,
};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const RESET_SENT: &str = "Check your email for the instructions to reset your password";
const INVALID_RESET_TOKEN: &str = "Invalid token: the link may have expired";
const PASSWORD_RESET: &str = "Your password has been reset";

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn already_logged_in() -> Response {
    Redirect::to(DEFAULT_LANDING).into_response()
}

pub async fn login_form(
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
    flash: Flash,
) -> Response {
    if user.is_some() {
        return already_logged_in();
    }

    let html = views::login(
        &Context::new(None, flash.messages()),
        "",
        query.next.as_deref(),
        &FieldErrors::new(),
    );
    flash.render(StatusCode::OK, html)
}

pub async fn login(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
    flash: Flash,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(already_logged_in());
    }

    if let Err(errors) = form.validate() {
        let html = views::login(
            &Context::new(None, flash.messages()),
            &form.username,
            query.next.as_deref(),
            &field_errors(&errors),
        );
        return Ok(flash.render(StatusCode::OK, html));
    }

    let user = match state
        .credentials
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(AppError::InvalidCredentials) => {
            metrics::record_login(false);
            tracing::info!(username = %form.username, "Login rejected");
            let retry = match query.next.as_deref() {
                Some(next) => format!("/login?next={}", encode_component(next)),
                None => "/login".to_string(),
            };
            return flash::redirect(&retry, INVALID_CREDENTIALS);
        }
        Err(e) => return Err(e),
    };

    let auth = &state.config.auth;
    let remember = form.remember();
    let ttl = if remember {
        auth.remember_ttl_secs
    } else {
        auth.session_ttl_secs
    };
    let token = state.tokens.issue_session_token(user.id, ttl)?;
    let cookie = session_cookie(auth, &token, remember)?;

    metrics::record_login(true);
    tracing::info!(user_id = user.id, remember = remember, "User logged in");

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(&safe_next(query.next.as_deref())),
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Response> {
    if let Some(user) = user {
        tracing::info!(user_id = user.id, "User logged out");
    }

    let cookie = clear_session_cookie(&state.config.auth)?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(DEFAULT_LANDING),
    )
        .into_response())
}

pub async fn reset_request_form(MaybeUser(user): MaybeUser, flash: Flash) -> Response {
    if user.is_some() {
        return already_logged_in();
    }

    let html = views::reset_request(&Context::new(None, flash.messages()), "", &FieldErrors::new());
    flash.render(StatusCode::OK, html)
}

/// Mail a reset link when the address belongs to an account
///
/// The response is the same whether or not it does.
pub async fn reset_request(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    flash: Flash,
    Form(form): Form<ResetRequestForm>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(already_logged_in());
    }

    if let Err(errors) = form.validate() {
        let html = views::reset_request(
            &Context::new(None, flash.messages()),
            &form.email,
            &field_errors(&errors),
        );
        return Ok(flash.render(StatusCode::OK, html));
    }

    if let Some(user) = state.repo.users().find_by_email(&form.email).await? {
        let token = state.tokens.issue_reset_token(&user)?;
        match send_password_reset_email(
            state.mailer.as_ref(),
            &state.config.mail.base_url,
            &user,
            &token,
        )
        .await
        {
            Ok(()) => {
                metrics::record_password_reset("requested");
                tracing::info!(user_id = user.id, "Password reset mail sent");
            }
            Err(e) => tracing::error!(user_id = user.id, error = %e, "Password reset mail failed"),
        }
    } else {
        tracing::debug!("Password reset requested for an unknown address");
    }

    flash::redirect("/login", RESET_SENT)
}

/// The account a reset token is bound to, if the token is still good
async fn reset_target(state: &AppState, token: &str) -> Result<Option<User>> {
    match state.tokens.verify_reset_token(token) {
        Some(user_id) => state.repo.users().find_by_id(user_id).await,
        None => Ok(None),
    }
}

pub async fn reset_password_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
    flash: Flash,
) -> Result<Response> {
    if user.is_some() {
        return Ok(already_logged_in());
    }

    if reset_target(&state, &token).await?.is_none() {
        return flash::redirect(DEFAULT_LANDING, INVALID_RESET_TOKEN);
    }

    let html = views::reset_password(&Context::new(None, flash.messages()), &token, &FieldErrors::new());
    Ok(flash.render(StatusCode::OK, html))
}

pub async fn reset_password(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(token): Path<String>,
    flash: Flash,
    Form(form): Form<ResetPasswordForm>,
) -> Result<Response> {
    if user.is_some() {
        return Ok(already_logged_in());
    }

    let Some(target) = reset_target(&state, &token).await? else {
        tracing::info!("Rejected password reset token");
        return flash::redirect(DEFAULT_LANDING, INVALID_RESET_TOKEN);
    };

    if let Err(errors) = form.validate() {
        let html = views::reset_password(
            &Context::new(None, flash.messages()),
            &token,
            &field_errors(&errors),
        );
        return Ok(flash.render(StatusCode::OK, html));
    }

    state.credentials.set_password(&target, &form.password).await?;
    metrics::record_password_reset("completed");

    flash::redirect("/login", PASSWORD_RESET)
}
