//! Keyword entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "keywords")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article_keyword::Entity")]
    ArticleKeywords,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        super::article_keyword::Relation::Article.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::article_keyword::Relation::Keyword.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
