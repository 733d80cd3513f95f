//! Credential store: password storage and checks on top of the user repository

use super::password;
use crate::db::models::User;
use crate::db::UserRepository;
use crate::errors::{AppError, Result};

#[derive(Clone)]
pub struct CredentialStore {
    users: UserRepository,
}

impl CredentialStore {
    pub fn new(users: UserRepository) -> Self {
        Self { users }
    }

    /// Replace the user's password; only the derived hash is stored
    pub async fn set_password(&self, user: &User, plaintext: &str) -> Result<User> {
        let hashword = password::hash(plaintext)?;
        let user = self.users.set_password_hash(user, hashword).await?;
        tracing::info!(user_id = user.id, "Password updated");
        Ok(user)
    }

    /// Whether `plaintext` is the user's password; accounts without one never match
    pub fn check_password(user: &User, plaintext: &str) -> bool {
        user.password_hash
            .as_deref()
            .map(|hashword| password::verify(plaintext, hashword))
            .unwrap_or(false)
    }

    /// Look the user up and check the password
    ///
    /// Unknown user and wrong password produce the same error.
    pub async fn authenticate(&self, username: &str, plaintext: &str) -> Result<User> {
        match self.users.find_by_username(username).await? {
            Some(user) if Self::check_password(&user, plaintext) => Ok(user),
            _ => Err(AppError::InvalidCredentials),
        }
    }
}
