//! Repository pattern for database operations
//!
//! One repository per entity, reachable from the `Repository` facade.
//! Operations that touch several rows run inside a transaction that is
//! committed at the end of the operation; an early return drops the
//! transaction, which rolls it back.

mod articles;
mod keywords;
mod references;
mod users;

pub use articles::ArticleRepository;
pub use keywords::{KeywordAttachment, KeywordRepository, PLACEHOLDER_SYNTHESIS, PLACEHOLDER_TITLE};
pub use references::ReferenceRepository;
pub use users::UserRepository;

use crate::db::DbPool;
use crate::errors::{AppError, Result};
use sea_orm::{DbErr, SqlErr};

/// Repository facade handing out the per-entity repositories
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn articles(&self) -> ArticleRepository {
        ArticleRepository::new(self.pool.clone())
    }

    pub fn keywords(&self) -> KeywordRepository {
        KeywordRepository::new(self.pool.clone())
    }

    pub fn references(&self) -> ReferenceRepository {
        ReferenceRepository::new(self.pool.clone())
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

/// Turn a unique-constraint violation into a conflict, anything else stays a database error
///
/// The repositories check for duplicates before writing; this covers the
/// window between that check and the insert.
pub(crate) fn map_unique_violation(
    err: DbErr,
    resource_type: &str,
    field: &str,
    value: &str,
) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::conflict(resource_type, field, value)
        }
        _ => AppError::Database(err),
    }
}
