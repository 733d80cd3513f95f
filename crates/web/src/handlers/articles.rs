//! Dashboard and article pages
//!
//! Articles are private: every page that names one checks that the
//! logged-in user owns it and serves the access-denied page otherwise.

use super::{access_denied, parse_id};
use crate::flash::{self, Flash};
use crate::forms::{field_error, field_errors, ArticleForm, FieldErrors};
use crate::middleware::CurrentUser;
use crate::views::{self, Context};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Form,
};
use synthese_common::{
    db::models::{Article, User},
    errors::{AppError, Result},
    metrics,
};
use validator::Validate;

const DUPLICATE_TITLE: &str = "An article with this title already exists.";

/// Article `raw_id` if it exists, or the 404 error
async fn find_article(state: &AppState, raw_id: &str) -> Result<Article> {
    let id = parse_id("article", raw_id)?;
    state.repo.articles().get(id).await
}

pub async fn index(CurrentUser(user): CurrentUser, flash: Flash) -> Response {
    let html = views::index(&Context::new(Some(&user), flash.messages()), &user);
    flash.render(StatusCode::OK, html)
}

pub async fn create_form(CurrentUser(user): CurrentUser, flash: Flash) -> Response {
    let html = views::article_editor(
        &Context::new(Some(&user), flash.messages()),
        None,
        "",
        "",
        &FieldErrors::new(),
    );
    flash.render(StatusCode::OK, html)
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Form(form): Form<ArticleForm>,
) -> Result<Response> {
    if let Err(errors) = form.validate() {
        return Ok(editor(&user, None, &form, flash, field_errors(&errors)));
    }

    match state
        .repo
        .articles()
        .create(user.id, &form.title, &form.synthesis)
        .await
    {
        Ok(article) => {
            metrics::record_article("create");
            tracing::info!(article_id = article.id, user_id = user.id, "Article created");
            flash::redirect("/user_articles_list", "The article has been added")
        }
        Err(AppError::Conflict { .. }) => Ok(duplicate_title(&user, None, &form, flash)),
        Err(e) => Err(e),
    }
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
) -> Result<Response> {
    let articles = state.repo.articles().list_for_owner(user.id).await?;
    let html = views::articles_list(&Context::new(Some(&user), flash.messages()), &articles);
    Ok(flash.render(StatusCode::OK, html))
}

pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    flash: Flash,
) -> Result<Response> {
    let article = find_article(&state, &id).await?;
    if !article.is_owned_by(user.id) {
        return Ok(access_denied(&user, flash));
    }

    let keywords = state.repo.articles().keywords_for(&article).await?;
    let references = state.repo.references().list_for_article(article.id).await?;

    let html = views::article(
        &Context::new(Some(&user), flash.messages()),
        &article,
        &keywords,
        &references,
    );
    Ok(flash.render(StatusCode::OK, html))
}

pub async fn modify_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    flash: Flash,
) -> Result<Response> {
    let article = find_article(&state, &id).await?;
    if !article.is_owned_by(user.id) {
        return Ok(access_denied(&user, flash));
    }

    let html = views::article_editor(
        &Context::new(Some(&user), flash.messages()),
        Some(article.id),
        &article.title,
        &article.synthesis,
        &FieldErrors::new(),
    );
    Ok(flash.render(StatusCode::OK, html))
}

pub async fn modify(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    flash: Flash,
    Form(form): Form<ArticleForm>,
) -> Result<Response> {
    let article = find_article(&state, &id).await?;
    if !article.is_owned_by(user.id) {
        return Ok(access_denied(&user, flash));
    }
    let article_id = article.id;

    if let Err(errors) = form.validate() {
        return Ok(editor(&user, Some(article_id), &form, flash, field_errors(&errors)));
    }

    match state
        .repo
        .articles()
        .update(article, &form.title, &form.synthesis)
        .await
    {
        Ok(article) => {
            metrics::record_article("update");
            tracing::info!(article_id = article.id, "Article modified");
            flash::redirect(&format!("/article/{}", article.id), "The article has been modified")
        }
        Err(AppError::Conflict { .. }) => Ok(duplicate_title(&user, Some(article_id), &form, flash)),
        Err(e) => Err(e),
    }
}

/// Delete the article with its keyword links and references
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    flash: Flash,
) -> Result<Response> {
    let article = find_article(&state, &id).await?;
    if !article.is_owned_by(user.id) {
        return Ok(access_denied(&user, flash));
    }

    let article_id = article.id;
    state.repo.articles().delete(article).await?;
    metrics::record_article("delete");
    tracing::info!(article_id = article_id, user_id = user.id, "Article deleted");

    flash::redirect("/user_articles_list", "The article has been deleted")
}

fn editor(
    user: &User,
    article_id: Option<i32>,
    form: &ArticleForm,
    flash: Flash,
    errors: FieldErrors,
) -> Response {
    let html = views::article_editor(
        &Context::new(Some(user), flash.messages()),
        article_id,
        &form.title,
        &form.synthesis,
        &errors,
    );
    flash.render(StatusCode::OK, html)
}

fn duplicate_title(
    user: &User,
    article_id: Option<i32>,
    form: &ArticleForm,
    mut flash: Flash,
) -> Response {
    flash.now(DUPLICATE_TITLE);
    editor(user, article_id, form, flash, field_error("title", DUPLICATE_TITLE))
}
