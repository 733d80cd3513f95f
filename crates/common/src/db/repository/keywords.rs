use super::map_unique_violation;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

/// Title of the article that hosts keywords submitted without an article
pub const PLACEHOLDER_TITLE: &str = "TMP";

/// Synthesis given to the placeholder article when it is created
pub const PLACEHOLDER_SYNTHESIS: &str = "tmp";

/// Outcome of attaching a keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordAttachment {
    /// A keyword with this description already exists somewhere; nothing changed
    AlreadyExists(Keyword),

    /// The keyword was created and linked to `article_id`
    Attached {
        keyword: Keyword,
        article_id: i32,
        placeholder_created: bool,
    },
}

impl KeywordAttachment {
    pub fn already_exists(&self) -> bool {
        matches!(self, KeywordAttachment::AlreadyExists(_))
    }

    pub fn keyword(&self) -> &Keyword {
        match self {
            KeywordAttachment::AlreadyExists(keyword) => keyword,
            KeywordAttachment::Attached { keyword, .. } => keyword,
        }
    }
}

/// Keywords and their article links
#[derive(Clone)]
pub struct KeywordRepository {
    pool: DbPool,
}

impl KeywordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    pub async fn find_by_description(&self, description: &str) -> Result<Option<Keyword>> {
        find_by_description(self.conn(), description).await
    }

    pub async fn articles_for(&self, keyword: &Keyword) -> Result<Vec<Article>> {
        keyword
            .find_related(ArticleEntity)
            .order_by_asc(ArticleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Create a keyword and link it to `article`, or to the placeholder article
    ///
    /// Descriptions are unique system-wide, so an existing keyword is reported
    /// and left alone whatever article it is linked to. Without an article the
    /// keyword goes to the article titled [`PLACEHOLDER_TITLE`], created on
    /// demand and owned by `placeholder_owner`.
    pub async fn attach(
        &self,
        description: &str,
        article: Option<&Article>,
        placeholder_owner: i32,
    ) -> Result<KeywordAttachment> {
        match self.insert_and_link(description, article, placeholder_owner).await {
            Err(AppError::Conflict { resource_type, .. }) if resource_type == "keyword" => {
                self.lost_race(description).await
            }
            outcome => outcome,
        }
    }

    /// Outcome for an insert beaten by a concurrent attach of the same description
    async fn lost_race(&self, description: &str) -> Result<KeywordAttachment> {
        match self.find_by_description(description).await? {
            Some(existing) => {
                tracing::debug!(keyword_id = existing.id, "Keyword inserted concurrently");
                Ok(KeywordAttachment::AlreadyExists(existing))
            }
            None => Err(AppError::conflict("keyword", "description", description)),
        }
    }

    async fn insert_and_link(
        &self,
        description: &str,
        article: Option<&Article>,
        placeholder_owner: i32,
    ) -> Result<KeywordAttachment> {
        let txn = self.conn().begin().await?;

        if let Some(existing) = find_by_description(&txn, description).await? {
            return Ok(KeywordAttachment::AlreadyExists(existing));
        }

        let (article_id, placeholder_created) = match article {
            Some(article) => (article.id, false),
            None => placeholder_article(&txn, placeholder_owner).await?,
        };

        let keyword = KeywordActiveModel {
            description: Set(description.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, "keyword", "description", description))?;

        ArticleKeywordActiveModel {
            article_id: Set(article_id),
            keyword_id: Set(keyword.id),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(KeywordAttachment::Attached {
            keyword,
            article_id,
            placeholder_created,
        })
    }
}

async fn find_by_description<C: ConnectionTrait>(
    conn: &C,
    description: &str,
) -> Result<Option<Keyword>> {
    KeywordEntity::find()
        .filter(KeywordColumn::Description.eq(description))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Id of the placeholder article, creating it when missing
async fn placeholder_article<C: ConnectionTrait>(conn: &C, owner_id: i32) -> Result<(i32, bool)> {
    let existing = ArticleEntity::find()
        .filter(ArticleColumn::Title.eq(PLACEHOLDER_TITLE))
        .one(conn)
        .await?;

    if let Some(article) = existing {
        return Ok((article.id, false));
    }

    let now = Utc::now();
    let article = ArticleActiveModel {
        title: Set(PLACEHOLDER_TITLE.to_string()),
        synthesis: Set(PLACEHOLDER_SYNTHESIS.to_string()),
        creation_date: Set(now),
        update_date: Set(now),
        user_id: Set(owner_id),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| map_unique_violation(e, "article", "title", PLACEHOLDER_TITLE))?;

    tracing::info!(article_id = article.id, owner_id, "Placeholder article created");

    Ok((article.id, true))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_second_attach_reports_existing() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;

        let first = repo.keywords().attach("ml", None, alice.id).await.unwrap();
        assert!(!first.already_exists());

        let second = repo.keywords().attach("ml", None, alice.id).await.unwrap();
        assert!(second.already_exists());
        assert_eq!(second.keyword().id, first.keyword().id);

        let links = repo.keywords().articles_for(first.keyword()).await.unwrap();
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn test_placeholder_created_once() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;

        let first = repo.keywords().attach("ml", None, alice.id).await.unwrap();
        let second = repo.keywords().attach("rust", None, alice.id).await.unwrap();

        let (first_article, first_created) = match first {
            KeywordAttachment::Attached { article_id, placeholder_created, .. } => {
                (article_id, placeholder_created)
            }
            other => panic!("unexpected {:?}", other),
        };
        let (second_article, second_created) = match second {
            KeywordAttachment::Attached { article_id, placeholder_created, .. } => {
                (article_id, placeholder_created)
            }
            other => panic!("unexpected {:?}", other),
        };

        assert!(first_created);
        assert!(!second_created);
        assert_eq!(first_article, second_article);

        let placeholder = repo.articles().get(first_article).await.unwrap();
        assert_eq!(placeholder.title, PLACEHOLDER_TITLE);
        assert_eq!(placeholder.synthesis, PLACEHOLDER_SYNTHESIS);
        assert_eq!(placeholder.user_id, alice.id);
        assert_eq!(repo.articles().keywords_for(&placeholder).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_attach_to_given_article() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        let article = repo.articles().create(alice.id, "Foo", "a").await.unwrap();

        let outcome = repo.keywords().attach("ml", Some(&article), alice.id).await.unwrap();
        assert_eq!(
            outcome,
            KeywordAttachment::Attached {
                keyword: outcome.keyword().clone(),
                article_id: article.id,
                placeholder_created: false,
            }
        );
        assert!(repo.articles().find_by_title(PLACEHOLDER_TITLE).await.unwrap().is_none());

        // Existing anywhere means existing: it is not linked a second time
        let other = repo.articles().create(alice.id, "Bar", "b").await.unwrap();
        let again = repo.keywords().attach("ml", Some(&other), alice.id).await.unwrap();
        assert!(again.already_exists());
        assert!(repo.articles().keywords_for(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_losing_insert_race_reports_winner() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        let winner = repo.keywords().attach("ml", None, alice.id).await.unwrap();

        let outcome = repo.keywords().lost_race("ml").await.unwrap();
        assert_eq!(outcome, KeywordAttachment::AlreadyExists(winner.keyword().clone()));

        let err = repo.keywords().lost_race("rust").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }
}
