//! Article entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "articles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique across every user, not just per owner
    #[sea_orm(unique)]
    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub synthesis: String,

    pub creation_date: DateTimeUtc,

    pub update_date: DateTimeUtc,

    pub user_id: i32,
}

impl Model {
    pub fn is_owned_by(&self, user_id: i32) -> bool {
        self.user_id == user_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Author,

    #[sea_orm(has_many = "super::reference::Entity")]
    References,

    #[sea_orm(has_many = "super::article_keyword::Entity")]
    ArticleKeywords,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::References.def()
    }
}

impl Related<super::keyword::Entity> for Entity {
    fn to() -> RelationDef {
        super::article_keyword::Relation::Keyword.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::article_keyword::Relation::Article.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
