//! SeaORM entity models
//!
//! Database entities for Synthese

mod user;
mod article;
mod keyword;
mod article_keyword;
mod reference;

pub use user::{
    Entity as UserEntity,
    Model as User,
    ActiveModel as UserActiveModel,
    Column as UserColumn,
};

pub use article::{
    Entity as ArticleEntity,
    Model as Article,
    ActiveModel as ArticleActiveModel,
    Column as ArticleColumn,
};

pub use keyword::{
    Entity as KeywordEntity,
    Model as Keyword,
    ActiveModel as KeywordActiveModel,
    Column as KeywordColumn,
};

pub use article_keyword::{
    Entity as ArticleKeywordEntity,
    Model as ArticleKeyword,
    ActiveModel as ArticleKeywordActiveModel,
    Column as ArticleKeywordColumn,
};

pub use reference::{
    Entity as ReferenceEntity,
    Model as Reference,
    ActiveModel as ReferenceActiveModel,
    Column as ReferenceColumn,
};
