//! Keyword endpoint (JSON)

use super::parse_id;
use crate::forms::KeywordForm;
use crate::middleware::CurrentUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use synthese_common::{
    db::KeywordAttachment,
    errors::{AppError, Result},
    metrics,
};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddKeywordResponse {
    pub already_exists: bool,
}

/// Create a keyword for one of the caller's articles
///
/// Without `article_id` the keyword lands on the placeholder article. An
/// existing description is reported, never duplicated.
pub async fn add_keyword(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
    Form(form): Form<KeywordForm>,
) -> Result<Json<AddKeywordResponse>> {
    let user_id = parse_id("user", &user_id)?;
    if user_id != user.id {
        return Err(AppError::Forbidden {
            message: "Keywords can only be added to your own articles".to_string(),
        });
    }

    form.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("keywords".to_string()),
    })?;

    let article = match form.article_id {
        Some(article_id) => {
            let article = state.repo.articles().get(article_id).await?;
            if !article.is_owned_by(user.id) {
                return Err(AppError::Forbidden {
                    message: "Keywords can only be added to your own articles".to_string(),
                });
            }
            Some(article)
        }
        None => None,
    };

    let attachment = state
        .repo
        .keywords()
        .attach(&form.keywords, article.as_ref(), user.id)
        .await?;

    if let KeywordAttachment::Attached {
        keyword,
        article_id,
        placeholder_created,
    } = &attachment
    {
        metrics::record_keyword_created();
        tracing::info!(
            keyword_id = keyword.id,
            article_id = article_id,
            placeholder_created = placeholder_created,
            "Keyword attached"
        );
    }

    Ok(Json(AddKeywordResponse {
        already_exists: attachment.already_exists(),
    }))
}
