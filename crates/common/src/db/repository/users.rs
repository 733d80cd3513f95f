use super::map_unique_violation;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

/// User accounts
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Create a user without a password
    pub async fn create(&self, username: &str, email: &str) -> Result<User> {
        if self.find_by_username(username).await?.is_some() {
            return Err(AppError::conflict("user", "username", username));
        }
        if self.find_by_email(email).await?.is_some() {
            return Err(AppError::conflict("user", "email", email));
        }

        let user = UserActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(None),
            ..Default::default()
        };

        user.insert(self.conn())
            .await
            .map_err(|e| map_unique_violation(e, "user", "username or email", username))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Change username and email, refusing values held by another account
    pub async fn update_profile(&self, user: &User, username: &str, email: &str) -> Result<User> {
        if let Some(other) = self.find_by_username(username).await? {
            if other.id != user.id {
                return Err(AppError::conflict("user", "username", username));
            }
        }
        if let Some(other) = self.find_by_email(email).await? {
            if other.id != user.id {
                return Err(AppError::conflict("user", "email", email));
            }
        }

        let mut active: UserActiveModel = user.clone().into();
        active.username = Set(username.to_string());
        active.email = Set(email.to_string());

        active
            .update(self.conn())
            .await
            .map_err(|e| map_unique_violation(e, "user", "username or email", username))
    }

    /// Store an already derived password hash
    pub async fn set_password_hash(&self, user: &User, password_hash: String) -> Result<User> {
        let mut active: UserActiveModel = user.clone().into();
        active.password_hash = Set(Some(password_hash));
        active.update(self.conn()).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::errors::AppError;

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;

        assert_eq!(alice.username, "alice");
        assert!(alice.password_hash.is_none());

        let found = repo.users().find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        let found = repo.users().find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, alice.id);
        assert!(repo.users().find_by_id(alice.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_and_email_are_unique() {
        let repo = repository().await;
        user(&repo, "alice").await;

        let err = repo.users().create("alice", "other@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field, .. } if field == "username"));

        let err = repo.users().create("bob", "alice@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let repo = repository().await;
        let alice = user(&repo, "alice").await;
        user(&repo, "bob").await;

        // Keeping one's own values is not a conflict
        let same = repo
            .users()
            .update_profile(&alice, "alice", "alice@example.com")
            .await
            .unwrap();
        assert_eq!(same.username, "alice");

        let err = repo
            .users()
            .update_profile(&alice, "bob", "alice@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let renamed = repo
            .users()
            .update_profile(&alice, "alicia", "alicia@example.com")
            .await
            .unwrap();
        assert_eq!(renamed.username, "alicia");
        assert_eq!(renamed.email, "alicia@example.com");
        assert!(repo.users().find_by_username("alice").await.unwrap().is_none());
    }
}
