use super::{
    ArticleChanges, ArticleFilter, ArticlePage, CategoryChanges, NewArticle, NewCategory,
    NewComment, NewTag, NewUser, PageWindow, Store, StoreError, UniqueField, UserChanges,
};
use crate::models::{
    Article, ArticleStatus, ArticleView, AuthorRef, Category, CategoryRef, Comment, CommentStatus,
    Tag, TagRef, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Encode, PgPool, Postgres, QueryBuilder, Type};
use std::collections::HashMap;
use uuid::Uuid;

const ARTICLE_SELECT: &str = r#"
    SELECT
        a.id,
        a.title,
        a.slug,
        a.content,
        a.excerpt,
        a.featured_image,
        a.status,
        a.is_premium,
        a.views,
        a.published_at,
        a.meta_description,
        a.meta_keywords,
        a.canonical_url,
        a.author_id,
        a.category_id,
        a.created_at,
        a.updated_at,
        u.id AS author_ref,
        u.name AS author_name,
        u.email AS author_email,
        c.id AS category_ref,
        c.name AS category_name,
        c.slug AS category_slug
    FROM
        articles a
    LEFT JOIN users u ON u.id = a.author_id
    LEFT JOIN categories c ON c.id = a.category_id
"#;

const ARTICLE_ORDER: &str = " ORDER BY a.published_at DESC NULLS LAST, a.created_at DESC";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
    excerpt: Option<String>,
    featured_image: Option<String>,
    status: ArticleStatus,
    is_premium: bool,
    views: i64,
    published_at: Option<DateTime<Utc>>,
    meta_description: Option<String>,
    meta_keywords: Option<String>,
    canonical_url: Option<String>,
    author_id: Uuid,
    category_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_ref: Option<Uuid>,
    author_name: Option<String>,
    author_email: Option<String>,
    category_ref: Option<Uuid>,
    category_name: Option<String>,
    category_slug: Option<String>,
}

impl ArticleRow {
    fn author(&self) -> Option<AuthorRef> {
        Some(AuthorRef {
            id: self.author_ref?,
            name: self.author_name.clone(),
            email: self.author_email.clone()?,
        })
    }

    fn category(&self) -> Option<CategoryRef> {
        Some(CategoryRef {
            id: self.category_ref?,
            name: self.category_name.clone()?,
            slug: self.category_slug.clone()?,
        })
    }

    fn into_article(self, tag_ids: Vec<Uuid>) -> Article {
        Article {
            id: self.id,
            title: self.title,
            slug: self.slug,
            content: self.content,
            excerpt: self.excerpt,
            featured_image: self.featured_image,
            status: self.status,
            is_premium: self.is_premium,
            views: self.views,
            published_at: self.published_at,
            meta_description: self.meta_description,
            meta_keywords: self.meta_keywords,
            canonical_url: self.canonical_url,
            author_id: self.author_id,
            category_id: self.category_id,
            tag_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn into_view(self, tags: Vec<TagRef>) -> ArticleView {
        let author = self.author();
        let category = self.category();
        let tag_ids = tags.iter().map(|t| t.id).collect();
        ArticleView::from_parts(self.into_article(tag_ids), author, category, tags)
    }
}

// Unique violations surface as `Duplicate` so the caller never has to pre-check.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            if let Some(field) = db.constraint().and_then(UniqueField::from_constraint) {
                return StoreError::Duplicate(field);
            }
        }
    }
    StoreError::Database(err)
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND a.status = ").push_bind(status);
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND a.category_id = ").push_bind(category_id);
    }
    if let Some(is_premium) = filter.is_premium {
        qb.push(" AND a.is_premium = ").push_bind(is_premium);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (a.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

// Appends `, column = $n` when the field was supplied. Every SET list starts
// with `updated_at = now()` so the separator is always needed.
fn set<'a, T>(qb: &mut QueryBuilder<'a, Postgres>, column: &str, value: Option<T>)
where
    T: 'a + Encode<'a, Postgres> + Type<Postgres>,
{
    if let Some(value) = value {
        qb.push(", ").push(column).push(" = ").push_bind(value);
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn tags_for(&self, article_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<TagRef>>, StoreError> {
        let rows = sqlx::query_as::<_, (Uuid, Uuid, String, String)>(
            r#"
                SELECT at.article_id, t.id, t.name, t.slug
                FROM article_tags at
                JOIN tags t ON t.id = at.tag_id
                WHERE at.article_id = ANY($1)
                ORDER BY at.article_id, at.position
            "#,
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_article: HashMap<Uuid, Vec<TagRef>> = HashMap::new();
        for (article_id, id, name, slug) in rows {
            by_article
                .entry(article_id)
                .or_default()
                .push(TagRef { id, name, slug });
        }
        Ok(by_article)
    }

    async fn into_views(&self, rows: Vec<ArticleRow>) -> Result<Vec<ArticleView>, StoreError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.tags_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let article_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_view(article_tags)
            })
            .collect())
    }

    async fn fetch_views(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<ArticleView>, StoreError> {
        let rows = qb
            .build_query_as::<ArticleRow>()
            .fetch_all(&self.pool)
            .await?;
        self.into_views(rows).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_articles(
        &self,
        filter: &ArticleFilter,
        window: PageWindow,
    ) -> Result<ArticlePage, StoreError> {
        let mut qb = QueryBuilder::new(ARTICLE_SELECT);
        push_filters(&mut qb, filter);
        qb.push(ARTICLE_ORDER)
            .push(" LIMIT ")
            .push_bind(window.limit)
            .push(" OFFSET ")
            .push_bind(window.offset);
        let articles = self.fetch_views(qb).await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM articles a");
        push_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(ArticlePage { articles, total })
    }

    async fn get_article(&self, id: Uuid) -> Result<Option<Article>, StoreError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!("{ARTICLE_SELECT} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let tag_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT tag_id FROM article_tags WHERE article_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(row.into_article(tag_ids)))
    }

    async fn find_article(&self, id: Uuid) -> Result<Option<ArticleView>, StoreError> {
        let mut qb = QueryBuilder::new(ARTICLE_SELECT);
        qb.push(" WHERE a.id = ").push_bind(id);
        Ok(self.fetch_views(qb).await?.pop())
    }

    async fn find_published_article(&self, slug: &str) -> Result<Option<ArticleView>, StoreError> {
        let mut qb = QueryBuilder::new(ARTICLE_SELECT);
        qb.push(" WHERE a.slug = ")
            .push_bind(slug.to_string())
            .push(" AND a.status = ")
            .push_bind(ArticleStatus::Published);
        Ok(self.fetch_views(qb).await?.pop())
    }

    async fn related_articles(
        &self,
        category_id: Uuid,
        exclude: Uuid,
        limit: i64,
    ) -> Result<Vec<ArticleView>, StoreError> {
        let mut qb = QueryBuilder::new(ARTICLE_SELECT);
        qb.push(" WHERE a.category_id = ")
            .push_bind(category_id)
            .push(" AND a.id <> ")
            .push_bind(exclude)
            .push(" AND a.status = ")
            .push_bind(ArticleStatus::Published)
            .push(ARTICLE_ORDER)
            .push(" LIMIT ")
            .push_bind(limit);
        self.fetch_views(qb).await
    }

    async fn insert_article(&self, new: NewArticle) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
                INSERT INTO articles (
                    id,
                    title,
                    slug,
                    content,
                    excerpt,
                    featured_image,
                    status,
                    is_premium,
                    published_at,
                    meta_description,
                    meta_keywords,
                    canonical_url,
                    author_id,
                    category_id
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(id)
        .bind(&new.title)
        .bind(&new.slug)
        .bind(&new.content)
        .bind(&new.excerpt)
        .bind(&new.featured_image)
        .bind(new.status)
        .bind(new.is_premium)
        .bind(new.published_at)
        .bind(&new.meta_description)
        .bind(&new.meta_keywords)
        .bind(&new.canonical_url)
        .bind(new.author_id)
        .bind(new.category_id)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        insert_article_tags(&mut tx, id, &new.tag_ids).await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn update_article(&self, id: Uuid, changes: ArticleChanges) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE articles SET updated_at = now()");
        set(&mut qb, "title", changes.title);
        set(&mut qb, "slug", changes.slug);
        set(&mut qb, "content", changes.content);
        set(&mut qb, "excerpt", changes.excerpt);
        set(&mut qb, "featured_image", changes.featured_image);
        set(&mut qb, "status", changes.status);
        set(&mut qb, "is_premium", changes.is_premium);
        set(&mut qb, "published_at", changes.published_at);
        set(&mut qb, "meta_description", changes.meta_description);
        set(&mut qb, "meta_keywords", changes.meta_keywords);
        set(&mut qb, "canonical_url", changes.canonical_url);
        set(&mut qb, "category_id", changes.category_id);
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        if let Some(tag_ids) = changes.tag_ids {
            sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_article_tags(&mut tx, id, &tag_ids).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_views(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE articles SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT * FROM categories ORDER BY display_order ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
                INSERT INTO categories (
                    id,
                    name,
                    slug,
                    description,
                    icon,
                    display_order,
                    meta_title,
                    meta_description
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(&new.icon)
        .bind(new.display_order)
        .bind(&new.meta_title)
        .bind(&new.meta_description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> Result<Option<Category>, StoreError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE categories SET updated_at = now()");
        set(&mut qb, "name", changes.name);
        set(&mut qb, "slug", changes.slug);
        set(&mut qb, "description", changes.description);
        set(&mut qb, "icon", changes.icon);
        set(&mut qb, "display_order", changes.display_order);
        set(&mut qb, "meta_title", changes.meta_title);
        set(&mut qb, "meta_description", changes.meta_description);
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        qb.build_query_as::<Category>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        Ok(
            sqlx::query_as::<_, Tag>("SELECT id, name, slug, created_at FROM tags ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn insert_tag(&self, new: NewTag) -> Result<Tag, StoreError> {
        sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (id, name, slug) VALUES ($1, $2, $3) RETURNING id, name, slug, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.slug)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
                INSERT INTO users (id, name, email, password_hash, role)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE users SET updated_at = now()");
        set(&mut qb, "name", changes.name);
        set(&mut qb, "role", changes.role);
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        Ok(qb
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_approved_comments(&self, article_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE article_id = $1 AND status = $2 ORDER BY created_at ASC",
        )
        .bind(article_id)
        .bind(CommentStatus::Approved)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(
            sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
                INSERT INTO comments (id, content, status, user_id, article_id, parent_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.content)
        .bind(CommentStatus::Pending)
        .bind(new.user_id)
        .bind(new.article_id)
        .bind(new.parent_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn set_comment_status(
        &self,
        id: Uuid,
        status: CommentStatus,
    ) -> Result<Option<Comment>, StoreError> {
        Ok(sqlx::query_as::<_, Comment>(
            "UPDATE comments SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_article_tags(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    article_id: Uuid,
    tag_ids: &[Uuid],
) -> Result<(), StoreError> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    let mut qb = QueryBuilder::new("INSERT INTO article_tags (article_id, tag_id, position) ");
    qb.push_values(tag_ids.iter().enumerate(), |mut b, (position, tag_id)| {
        b.push_bind(article_id)
            .push_bind(*tag_id)
            .push_bind(position as i32);
    });
    qb.build().execute(&mut **tx).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn constraint_names_round_trip() {
        for field in [
            UniqueField::UserEmail,
            UniqueField::CategoryName,
            UniqueField::CategorySlug,
            UniqueField::TagSlug,
            UniqueField::ArticleSlug,
        ] {
            assert_eq!(UniqueField::from_constraint(field.constraint()), Some(field));
        }
        assert_eq!(UniqueField::from_constraint("articles_pkey"), None);
    }

    #[test]
    fn enum_columns_decode_from_text() {
        let text = <String as Type<Postgres>>::type_info();
        assert!(<ArticleStatus as Type<Postgres>>::compatible(&text));
        assert!(<CommentStatus as Type<Postgres>>::compatible(&text));
        assert!(<crate::models::Role as Type<Postgres>>::compatible(&text));
    }

    #[test]
    fn filters_bind_only_supplied_fields() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM articles a");
        push_filters(
            &mut qb,
            &ArticleFilter {
                status: Some(ArticleStatus::Published),
                search: Some("rust".into()),
                ..Default::default()
            },
        );
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM articles a WHERE TRUE AND a.status = $1 AND (a.title ILIKE $2 OR a.content ILIKE $3)"
        );
    }
}
