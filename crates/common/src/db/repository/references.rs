use super::map_unique_violation;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Sources cited by articles
#[derive(Clone)]
pub struct ReferenceRepository {
    pool: DbPool,
}

impl ReferenceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Add a reference to an article; descriptions are unique system-wide
    pub async fn add(&self, article_id: i32, description: &str) -> Result<Reference> {
        let duplicate = ReferenceEntity::find()
            .filter(ReferenceColumn::Description.eq(description))
            .one(self.conn())
            .await?;
        if duplicate.is_some() {
            return Err(AppError::conflict("reference", "description", description));
        }

        ReferenceActiveModel {
            description: Set(description.to_string()),
            article_id: Set(article_id),
            ..Default::default()
        }
        .insert(self.conn())
        .await
        .map_err(|e| map_unique_violation(e, "reference", "description", description))
    }

    pub async fn list_for_article(&self, article_id: i32) -> Result<Vec<Reference>> {
        ReferenceEntity::find()
            .filter(ReferenceColumn::ArticleId.eq(article_id))
            .order_by_asc(ReferenceColumn::Id)
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
    async fn test_add_and_list() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        let foo = repo.articles().create(alice.id, "Foo", "a").await.unwrap();
        let bar = repo.articles().create(alice.id, "Bar", "b").await.unwrap();

        repo.references().add(foo.id, "first").await.unwrap();
        repo.references().add(foo.id, "second").await.unwrap();
        repo.references().add(bar.id, "third").await.unwrap();

        let listed: Vec<_> = repo
            .references()
            .list_for_article(foo.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.description)
            .collect();
        assert_eq!(listed, vec!["first", "second"]);

        let err = repo.references().add(bar.id, "first").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }
}
