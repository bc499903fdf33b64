mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{
    Article, ArticleStatus, ArticleView, Category, Comment, CommentStatus, Role, Tag, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub type SharedStore = Arc<dyn Store>;

/// Columns guarded by a unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    UserEmail,
    CategoryName,
    CategorySlug,
    TagSlug,
    ArticleSlug,
}

impl UniqueField {
    pub fn constraint(&self) -> &'static str {
        match self {
            Self::UserEmail => "users_email_key",
            Self::CategoryName => "categories_name_key",
            Self::CategorySlug => "categories_slug_key",
            Self::TagSlug => "tags_slug_key",
            Self::ArticleSlug => "articles_slug_key",
        }
    }

    pub fn from_constraint(name: &str) -> Option<Self> {
        [
            Self::UserEmail,
            Self::CategoryName,
            Self::CategorySlug,
            Self::TagSlug,
            Self::ArticleSlug,
        ]
        .into_iter()
        .find(|f| f.constraint() == name)
    }

    pub fn conflict_message(&self) -> &'static str {
        match self {
            Self::UserEmail => "User with this email already exists",
            Self::CategoryName => "Category with this name already exists",
            Self::CategorySlug => "Category with this slug already exists",
            Self::TagSlug => "Tag with this slug already exists",
            Self::ArticleSlug => "Article with this slug already exists",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate value for {}", .0.constraint())]
    Duplicate(UniqueField),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub status: Option<ArticleStatus>,
    pub category_id: Option<Uuid>,
    pub is_premium: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug)]
pub struct ArticlePage {
    pub articles: Vec<ArticleView>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: ArticleStatus,
    pub is_premium: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub tag_ids: Vec<Uuid>,
}

/// Partial article update. `None` leaves a column untouched; for nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub featured_image: Option<Option<String>>,
    pub status: Option<ArticleStatus>,
    pub is_premium: Option<bool>,
    pub published_at: Option<Option<DateTime<Utc>>>,
    pub meta_description: Option<Option<String>>,
    pub meta_keywords: Option<Option<String>>,
    pub canonical_url: Option<Option<String>>,
    pub category_id: Option<Uuid>,
    pub tag_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub display_order: i32,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub display_order: Option<i32>,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<Option<String>>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
    pub user_id: Uuid,
    pub article_id: Uuid,
    pub parent_id: Option<Uuid>,
}

/// Storage seam between the HTTP layer and a backend.
///
/// Writes that touch a unique column must fail with
/// [`StoreError::Duplicate`] atomically with respect to the write itself;
/// callers never pre-check uniqueness.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_articles(
        &self,
        filter: &ArticleFilter,
        window: PageWindow,
    ) -> Result<ArticlePage, StoreError>;
    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, StoreError>;
    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleView>, StoreError>;
    async fn find_published_article(&self, slug: &str) -> Result<Option<ArticleView>, StoreError>;
    async fn related_articles(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<ArticleView>, StoreError>;
    async fn insert_article(&self, article: NewArticle) -> Result<Uuid, StoreError>;
    /// Returns `false` when no article has this id.
    async fn update_article(&self, id: Uuid, changes: ArticleChanges) -> Result<bool, StoreError>;
    async fn delete_article(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Atomic `views = views + 1`.
    async fn increment_views(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;
    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError>;
    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<Option<Category>, StoreError>;
    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError>;
    async fn insert_tag(&self, tag: NewTag) -> Result<Tag, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_approved_comments(&self, article_id: Uuid) -> Result<Vec<Comment>, StoreError>;
    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError>;
    async fn insert_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;
    async fn set_comment_status(
        &self,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<Option<Comment>, StoreError>;
    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError>;
}
