//! Table creation from the entity definitions

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema};
use tracing::debug;

/// Create every table that does not exist yet, parents before children
pub(crate) async fn create_tables(conn: &DatabaseConnection) -> Result<()> {
    create_table(conn, UserEntity).await?;
    create_table(conn, ArticleEntity).await?;
    create_table(conn, KeywordEntity).await?;
    create_table(conn, ArticleKeywordEntity).await?;
    create_table(conn, ReferenceEntity).await?;
    Ok(())
}

async fn create_table<E: EntityTrait>(conn: &DatabaseConnection, entity: E) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();

    conn.execute(backend.build(&stmt)).await?;
    debug!(table = entity.table_name(), "Table ready");
    Ok(())
}
