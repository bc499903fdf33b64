use crate::{
    config::AppConfig,
    error::AppError,
    extractors::{IdPath, JsonBody},
    models::{ArticleStatus, ArticleView},
    params::{ArticleListParams, Pagination},
    patch::{self, double_option},
    store::{ArticleChanges, NewArticle, SharedStore},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

const RELATED_LIMIT: i64 = 3;

#[derive(Serialize, Deserialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleView>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize)]
pub struct ArticleEnvelope {
    pub article: ArticleView,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn article_not_found() -> AppError {
    AppError::not_found("Article not found")
}

pub async fn list_articles(
    State(store): State<SharedStore>,
    State(config): State<AppConfig>,
    params: Result<Query<ArticleListParams>, QueryRejection>,
) -> Result<Json<ArticleListResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::validation(e.body_text()))?;

    let window = params.window(config.max_page_limit)?;
    let filter = params.filter()?;
    let page = store.list_articles(&filter, window).await?;

    Ok(Json(ArticleListResponse {
        articles: page.articles,
        pagination: Pagination::new(window, page.total),
    }))
}

/// Returns the article as read; the view counter is bumped afterwards on a
/// background task, so `views` in the response is the pre-increment count.
pub async fn get_article(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
) -> Result<Json<ArticleEnvelope>, AppError> {
    let article = store.find_article(id).await?.ok_or_else(article_not_found)?;

    let counter = store.clone();
    tokio::spawn(async move {
        if let Err(e) = counter.increment_views(id).await {
            warn!(article_id = %id, error = %e, "failed to increment views");
        }
    });

    Ok(Json(ArticleEnvelope { article }))
}

pub async fn get_published_article(
    State(store): State<SharedStore>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleEnvelope>, AppError> {
    let article = store
        .find_published_article(&slug)
        .await?
        .ok_or_else(article_not_found)?;
    Ok(Json(ArticleEnvelope { article }))
}

#[derive(Serialize, Deserialize)]
pub struct RelatedResponse {
    pub articles: Vec<ArticleView>,
}

pub async fn related_articles(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
) -> Result<Json<RelatedResponse>, AppError> {
    let article = store.get_article(id).await?.ok_or_else(article_not_found)?;
    let articles = store
        .related_articles(article.category_id, article.id, RELATED_LIMIT)
        .await?;
    Ok(Json(RelatedResponse { articles }))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateArticleRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub featured_image: Option<String>,
    pub status: Option<ArticleStatus>,
    pub is_premium: Option<bool>,
    pub published_at: Option<DateTime<Utc>>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub canonical_url: Option<String>,
    pub author: Option<Uuid>,
    pub category: Option<Uuid>,
    pub tags: Option<Vec<Uuid>>,
}

pub async fn create_article(
    State(store): State<SharedStore>,
    JsonBody(payload): JsonBody<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ArticleEnvelope>), AppError> {
    let (Some(title), Some(slug), Some(content), Some(author_id), Some(category_id)) = (
        patch::required(payload.title),
        patch::required(payload.slug),
        patch::required(payload.content),
        payload.author,
        payload.category,
    ) else {
        return Err(AppError::validation("Missing required fields"));
    };

    let status = payload.status.unwrap_or_default();
    let published_at = match status {
        ArticleStatus::Published => Some(payload.published_at.unwrap_or_else(Utc::now)),
        _ => payload.published_at,
    };

    let id = store
        .insert_article(NewArticle {
            title,
            slug,
            content,
            excerpt: payload.excerpt,
            featured_image: payload.featured_image,
            status,
            is_premium: payload.is_premium.unwrap_or(false),
            published_at,
            meta_description: payload.meta_description,
            meta_keywords: payload.meta_keywords,
            canonical_url: payload.canonical_url,
            author_id,
            category_id,
            tag_ids: payload.tags.unwrap_or_default(),
        })
        .await?;

    let article = store
        .find_article(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("article {id} vanished after insert"))?;
    info!(article_id = %id, slug = %article.slug, "article created");

    Ok((StatusCode::CREATED, Json(ArticleEnvelope { article })))
}

/// Partial update body. A missing key leaves the column alone; `null` clears
/// nullable columns.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub excerpt: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub featured_image: Option<Option<String>>,
    pub status: Option<ArticleStatus>,
    pub is_premium: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub published_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta_description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta_keywords: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub canonical_url: Option<Option<String>>,
    pub category: Option<Uuid>,
    pub tags: Option<Vec<Uuid>>,
}

pub async fn update_article(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
    JsonBody(payload): JsonBody<UpdateArticleRequest>,
) -> Result<Json<ArticleEnvelope>, AppError> {
    let existing = store.get_article(id).await?.ok_or_else(article_not_found)?;

    let status = payload.status.unwrap_or(existing.status);
    let publishing = status == ArticleStatus::Published && existing.status != status;
    // An explicit timestamp always wins; otherwise only the transition into
    // PUBLISHED stamps one. A published article never loses its stamp.
    let published_at = match (payload.published_at, publishing) {
        (Some(Some(at)), _) => Some(Some(at)),
        (_, true) => Some(Some(Utc::now())),
        (Some(None), false) if status == ArticleStatus::Published => None,
        (explicit, false) => explicit,
    };

    let changes = ArticleChanges {
        title: patch::non_blank("title", payload.title)?,
        slug: patch::non_blank("slug", payload.slug)?,
        content: patch::non_blank("content", payload.content)?,
        excerpt: payload.excerpt,
        featured_image: payload.featured_image,
        status: payload.status,
        is_premium: payload.is_premium,
        published_at,
        meta_description: payload.meta_description,
        meta_keywords: payload.meta_keywords,
        canonical_url: payload.canonical_url,
        category_id: payload.category,
        tag_ids: payload.tags,
    };

    if !store.update_article(id, changes).await? {
        return Err(article_not_found());
    }

    let article = store.find_article(id).await?.ok_or_else(article_not_found)?;
    info!(article_id = %id, slug = %article.slug, status = ?article.status, "article updated");

    Ok(Json(ArticleEnvelope { article }))
}

pub async fn delete_article(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, AppError> {
    if !store.delete_article(id).await? {
        return Err(article_not_found());
    }
    info!(article_id = %id, "article deleted");

    Ok(Json(MessageResponse {
        message: "Article deleted successfully".to_string(),
    }))
}
