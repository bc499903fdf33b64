use super::{
    ArticleChanges, ArticleFilter, ArticlePage, CategoryChanges, NewArticle, NewCategory,
    NewComment, NewTag, NewUser, PageWindow, Store, StoreError, UniqueField, UserChanges,
};
use crate::models::{
    Article, ArticleStatus, ArticleView, AuthorRef, Category, CategoryRef, Comment, CommentStatus,
    Tag, TagRef, User,
};
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    tags: HashMap<Uuid, Tag>,
    articles: HashMap<Uuid, Article>,
    // Insertion order doubles as a stable tie-break for equal timestamps.
    comments: Vec<Comment>,
}

impl Collections {
    fn view(&self, article: &Article) -> ArticleView {
        let author = self.users.get(&article.author_id).map(|u| AuthorRef {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
        });
        let category = self.categories.get(&article.category_id).map(|c| CategoryRef {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
        });
        let tags = article
            .tag_ids
            .iter()
            .filter_map(|id| self.tags.get(id))
            .map(|t| TagRef {
                id: t.id,
                name: t.name.clone(),
                slug: t.slug.clone(),
            })
            .collect();
        ArticleView::from_parts(article.clone(), author, category, tags)
    }

    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.articles
            .values()
            .any(|a| a.slug == slug && Some(a.id) != except)
    }

    fn sorted_articles<'a>(&'a self, keep: impl Fn(&Article) -> bool) -> Vec<&'a Article> {
        let mut matched: Vec<&Article> = self.articles.values().filter(|a| keep(a)).collect();
        matched.sort_by(|a, b| newest_first(a, b));
        matched
    }
}

// publishedAt descending with unpublished rows last, then createdAt descending.
fn newest_first(a: &Article, b: &Article) -> Ordering {
    let by_published = match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_published.then_with(|| b.created_at.cmp(&a.created_at))
}

fn matches(filter: &ArticleFilter, needle: Option<&str>, article: &Article) -> bool {
    filter.status.is_none_or(|s| article.status == s)
        && filter.category_id.is_none_or(|c| article.category_id == c)
        && filter.is_premium.is_none_or(|p| article.is_premium == p)
        && needle.is_none_or(|n| {
            article.title.to_lowercase().contains(n) || article.content.to_lowercase().contains(n)
        })
}

fn apply<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// In-process store with the same observable behaviour as [`super::PgStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_articles(
        &self,
        filter: &ArticleFilter,
        window: PageWindow,
    ) -> Result<ArticlePage, StoreError> {
        let db = self.inner.read().await;
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let matched = db.sorted_articles(|a| matches(filter, needle.as_deref(), a));
        let total = matched.len() as i64;
        let articles = matched
            .into_iter()
            .skip(usize::try_from(window.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(window.limit).unwrap_or(usize::MAX))
            .map(|a| db.view(a))
            .collect();
        Ok(ArticlePage { articles, total })
    }

    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, StoreError> {
        Ok(self.inner.read().await.articles.get(&id).cloned())
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleView>, StoreError> {
        let db = self.inner.read().await;
        Ok(db.articles.get(&id).map(|a| db.view(a)))
    }

    async fn find_published_article(&self, slug: &str) -> Result<Option<ArticleView>, StoreError> {
        let db = self.inner.read().await;
        Ok(db
            .articles
            .values()
            .find(|a| a.slug == slug && a.status == ArticleStatus::Published)
            .map(|a| db.view(a)))
    }

    async fn related_articles(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<ArticleView>, StoreError> {
        let db = self.inner.read().await;
        Ok(db
            .sorted_articles(|a| {
                a.category_id == category_id
                    && a.id != exclude
                    && a.status == ArticleStatus::Published
            })
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|a| db.view(a))
            .collect())
    }

    async fn insert_article(&self, new: NewArticle) -> Result<Uuid, StoreError> {
        let mut db = self.inner.write().await;
        if db.slug_taken(&new.slug, None) {
            return Err(StoreError::Duplicate(UniqueField::ArticleSlug));
        }
        let now = Utc::now();
        let id = Uuid::new_v4();
        db.articles.insert(
            id,
            Article {
                id,
                title: new.title,
                slug: new.slug,
                content: new.content,
                excerpt: new.excerpt,
                featured_image: new.featured_image,
                status: new.status,
                is_premium: new.is_premium,
                views: 0,
                published_at: new.published_at,
                meta_description: new.meta_description,
                meta_keywords: new.meta_keywords,
                canonical_url: new.canonical_url,
                author_id: new.author_id,
                category_id: new.category_id,
                tag_ids: new.tag_ids,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_article(&self, id: Uuid, changes: ArticleChanges) -> Result<bool, StoreError> {
        let mut db = self.inner.write().await;
        if let Some(slug) = &changes.slug {
            if db.slug_taken(slug, Some(id)) {
                return Err(StoreError::Duplicate(UniqueField::ArticleSlug));
            }
        }
        let Some(article) = db.articles.get_mut(&id) else {
            return Ok(false);
        };
        apply(&mut article.title, changes.title);
        apply(&mut article.slug, changes.slug);
        apply(&mut article.content, changes.content);
        apply(&mut article.excerpt, changes.excerpt);
        apply(&mut article.featured_image, changes.featured_image);
        apply(&mut article.status, changes.status);
        apply(&mut article.is_premium, changes.is_premium);
        apply(&mut article.published_at, changes.published_at);
        apply(&mut article.meta_description, changes.meta_description);
        apply(&mut article.meta_keywords, changes.meta_keywords);
        apply(&mut article.canonical_url, changes.canonical_url);
        apply(&mut article.category_id, changes.category_id);
        apply(&mut article.tag_ids, changes.tag_ids);
        article.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.articles.remove(&id).is_some())
    }

    async fn increment_views(&self, id: Uuid) -> Result<(), StoreError> {
        if let Some(article) = self.inner.write().await.articles.get_mut(&id) {
            article.views += 1;
        }
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let db = self.inner.read().await;
        let mut categories: Vec<Category> = db.categories.values().cloned().collect();
        categories.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(categories)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let db = self.inner.read().await;
        Ok(db.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn insert_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let mut db = self.inner.write().await;
        if db.categories.values().any(|c| c.slug == new.slug) {
            return Err(StoreError::Duplicate(UniqueField::CategorySlug));
        }
        if db.categories.values().any(|c| c.name == new.name) {
            return Err(StoreError::Duplicate(UniqueField::CategoryName));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: new.name,
            slug: new.slug,
            description: new.description,
            icon: new.icon,
            display_order: new.display_order,
            meta_title: new.meta_title,
            meta_description: new.meta_description,
            created_at: now,
            updated_at: now,
        };
        db.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<Option<Category>, StoreError> {
        let mut db = self.inner.write().await;
        if let Some(slug) = &changes.slug {
            if db.categories.values().any(|c| c.id != id && &c.slug == slug) {
                return Err(StoreError::Duplicate(UniqueField::CategorySlug));
            }
        }
        if let Some(name) = &changes.name {
            if db.categories.values().any(|c| c.id != id && &c.name == name) {
                return Err(StoreError::Duplicate(UniqueField::CategoryName));
            }
        }
        let Some(category) = db.categories.get_mut(&id) else {
            return Ok(None);
        };
        apply(&mut category.name, changes.name);
        apply(&mut category.slug, changes.slug);
        apply(&mut category.description, changes.description);
        apply(&mut category.icon, changes.icon);
        apply(&mut category.display_order, changes.display_order);
        apply(&mut category.meta_title, changes.meta_title);
        apply(&mut category.meta_description, changes.meta_description);
        category.updated_at = Utc::now();
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.categories.remove(&id).is_some())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let db = self.inner.read().await;
        let mut tags: Vec<Tag> = db.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn insert_tag(&self, new: NewTag) -> Result<Tag, StoreError> {
        let mut db = self.inner.write().await;
        if db.tags.values().any(|t| t.slug == new.slug) {
            return Err(StoreError::Duplicate(UniqueField::TagSlug));
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: new.name,
            slug: new.slug,
            created_at: Utc::now(),
        };
        db.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let db = self.inner.read().await;
        let mut users: Vec<User> = db.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut db = self.inner.write().await;
        if db.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate(UniqueField::UserEmail));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        db.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut db = self.inner.write().await;
        let Some(user) = db.users.get_mut(&id) else {
            return Ok(None);
        };
        apply(&mut user.name, changes.name);
        apply(&mut user.role, changes.role);
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.users.remove(&id).is_some())
    }

    async fn list_approved_comments(&self, article_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let db = self.inner.read().await;
        let mut comments: Vec<Comment> = db
            .comments
            .iter()
            .filter(|c| c.article_id == article_id && c.status == CommentStatus::Approved)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        let db = self.inner.read().await;
        Ok(db.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            content: new.content,
            status: CommentStatus::Pending,
            user_id: new.user_id,
            article_id: new.article_id,
            parent_id: new.parent_id,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn set_comment_status(
        &self,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<Option<Comment>, StoreError> {
        let mut db = self.inner.write().await;
        let Some(comment) = db.comments.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        comment.status = status;
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut db = self.inner.write().await;
        let before = db.comments.len();
        db.comments.retain(|c| c.id != id);
        Ok(db.comments.len() != before)
    }
}
