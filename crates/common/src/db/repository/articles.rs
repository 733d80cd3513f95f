use super::map_unique_violation;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

/// Articles and the rows hanging off them
#[derive(Clone)]
pub struct ArticleRepository {
    pool: DbPool,
}

impl ArticleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Create an article; the title must not be used by any article of any user
    pub async fn create(&self, owner_id: i32, title: &str, synthesis: &str) -> Result<Article> {
        if self.find_by_title(title).await?.is_some() {
            return Err(AppError::conflict("article", "title", title));
        }

        let now = Utc::now();
        let article = ArticleActiveModel {
            title: Set(title.to_string()),
            synthesis: Set(synthesis.to_string()),
            creation_date: Set(now),
            update_date: Set(now),
            user_id: Set(owner_id),
            ..Default::default()
        };

        article
            .insert(self.conn())
            .await
            .map_err(|e| map_unique_violation(e, "article", "title", title))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Like `find_by_id`, but absence is an error
    pub async fn get(&self, id: i32) -> Result<Article> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))
    }

    pub async fn find_by_title(&self, title: &str) -> Result<Option<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::Title.eq(title))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Overwrite title and synthesis; `update_date` always moves forward
    pub async fn update(&self, article: Article, title: &str, synthesis: &str) -> Result<Article> {
        if let Some(other) = self.find_by_title(title).await? {
            if other.id != article.id {
                return Err(AppError::conflict("article", "title", title));
            }
        }

        let now = Utc::now().max(article.update_date + Duration::microseconds(1));

        let mut active: ArticleActiveModel = article.into();
        active.title = Set(title.to_string());
        active.synthesis = Set(synthesis.to_string());
        active.update_date = Set(now);

        active
            .update(self.conn())
            .await
            .map_err(|e| map_unique_violation(e, "article", "title", title))
    }

    /// Hard delete: keyword links, then references, then the article itself
    pub async fn delete(&self, article: Article) -> Result<()> {
        let txn = self.conn().begin().await?;

        let unlinked = ArticleKeywordEntity::delete_many()
            .filter(ArticleKeywordColumn::ArticleId.eq(article.id))
            .exec(&txn)
            .await?;

        let references = ReferenceEntity::delete_many()
            .filter(ReferenceColumn::ArticleId.eq(article.id))
            .exec(&txn)
            .await?;

        ArticleEntity::delete_by_id(article.id).exec(&txn).await?;

        txn.commit().await?;

        tracing::debug!(
            article_id = article.id,
            keyword_links = unlinked.rows_affected,
            references = references.rows_affected,
            "Article removed with its dependents"
        );

        Ok(())
    }

    /// Articles of one owner, oldest first
    pub async fn list_for_owner(&self, owner_id: i32) -> Result<Vec<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::UserId.eq(owner_id))
            .order_by_asc(ArticleColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn keywords_for(&self, article: &Article) -> Result<Vec<Keyword>> {
        article
            .find_related(KeywordEntity)
            .order_by_asc(KeywordColumn::Id)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::errors::AppError;

    #[tokio::test]
    async fn test_create_sets_both_dates() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;

        let article = repo.articles().create(alice.id, "Foo", "synthesis1").await.unwrap();
        assert_eq!(article.title, "Foo");
        assert_eq!(article.synthesis, "synthesis1");
        assert_eq!(article.creation_date, article.update_date);
        assert!(article.is_owned_by(alice.id));
    }

    #[tokio::test]
    async fn test_title_is_globally_unique() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        let bob = user(&repo, "bob").await;

        repo.articles().create(alice.id, "Foo", "a").await.unwrap();

        let err = repo.articles().create(alice.id, "Foo", "b").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        // Another owner does not get a pass either
        let err = repo.articles().create(bob.id, "Foo", "c").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_advances_update_date() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        let article = repo.articles().create(alice.id, "Foo", "a").await.unwrap();
        let created = article.creation_date;
        let before = article.update_date;

        let updated = repo.articles().update(article, "Bar", "b").await.unwrap();
        assert_eq!(updated.title, "Bar");
        assert_eq!(updated.synthesis, "b");
        assert_eq!(updated.creation_date, created);
        assert!(updated.update_date > before);

        // Same title again is fine for the same article
        let again = repo.articles().update(updated.clone(), "Bar", "c").await.unwrap();
        assert!(again.update_date > updated.update_date);
    }

    #[tokio::test]
    async fn test_update_rejects_title_of_other_article() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        repo.articles().create(alice.id, "Foo", "a").await.unwrap();
        let bar = repo.articles().create(alice.id, "Bar", "b").await.unwrap();

        let err = repo.articles().update(bar, "Foo", "b").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_list_for_owner_in_insertion_order() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        let bob = user(&repo, "bob").await;

        repo.articles().create(alice.id, "First", "a").await.unwrap();
        repo.articles().create(bob.id, "Other", "b").await.unwrap();
        repo.articles().create(alice.id, "Second", "c").await.unwrap();

        let titles: Vec<_> = repo
            .articles()
            .list_for_owner(alice.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_delete_removes_links_and_references() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        let article = repo.articles().create(alice.id, "Foo", "a").await.unwrap();
        let article_id = article.id;

        repo.keywords().attach("ml", Some(&article), alice.id).await.unwrap();
        repo.references().add(article_id, "Knuth, TAOCP").await.unwrap();
        assert_eq!(repo.articles().keywords_for(&article).await.unwrap().len(), 1);

        repo.articles().delete(article).await.unwrap();

        let err = repo.articles().get(article_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert!(repo.references().list_for_article(article_id).await.unwrap().is_empty());

        // The keyword itself survives, detached
        let keyword = repo.keywords().find_by_description("ml").await.unwrap().unwrap();
        assert!(repo.keywords().articles_for(&keyword).await.unwrap().is_empty());
    }
}
