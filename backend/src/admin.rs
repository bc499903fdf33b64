//! Admin article listing.
//!
//! [`ArticleManager`] holds the state behind the "Manage Articles" screen: it
//! loads up to [`ADMIN_FETCH_LIMIT`] articles once, filters them by status in
//! memory, and removes a row locally after the server confirms its deletion
//! (no refetch, no rollback).

use crate::models::{ArticleStatus, ArticleView, Role};
use crate::routes::articles::ArticleListResponse;
use async_trait::async_trait;
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub const ADMIN_FETCH_LIMIT: i64 = 100;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("only authors and admins can manage articles")]
    Forbidden,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded {status}: {message}")]
    Api { status: u16, message: String },
}

#[async_trait]
pub trait ArticleApi: Send + Sync {
    async fn fetch_articles(&self, limit: i64) -> Result<Vec<ArticleView>, AdminError>;
    async fn delete_article(&self, id: Uuid) -> Result<(), AdminError>;
}

/// [`ArticleApi`] over this service's JSON endpoints.
pub struct HttpArticleApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpArticleApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

async fn api_error(response: reqwest::Response) -> AdminError {
    let status = response.status().as_u16();
    let message = response
        .json::<ErrorBody>()
        .await
        .map(|b| b.error)
        .unwrap_or_else(|_| "unreadable error body".to_string());
    AdminError::Api { status, message }
}

#[async_trait]
impl ArticleApi for HttpArticleApi {
    async fn fetch_articles(&self, limit: i64) -> Result<Vec<ArticleView>, AdminError> {
        let response = self
            .client
            .get(format!("{}/api/articles", self.base_url))
            .query(&[("limit", limit)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json::<ArticleListResponse>().await?.articles)
    }

    async fn delete_article(&self, id: Uuid) -> Result<(), AdminError> {
        let response = self
            .client
            .delete(format!("{}/api/articles/{id}", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Published,
    Draft,
    Scheduled,
}

impl StatusFilter {
    pub fn matches(&self, status: ArticleStatus) -> bool {
        match self {
            Self::All => true,
            Self::Published => status == ArticleStatus::Published,
            Self::Draft => status == ArticleStatus::Draft,
            Self::Scheduled => status == ArticleStatus::Scheduled,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "published" => Ok(Self::Published),
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

pub struct ArticleManager<A> {
    api: A,
    articles: Vec<ArticleView>,
    filter: StatusFilter,
    loading: bool,
}

impl<A: ArticleApi> ArticleManager<A> {
    /// Opens the screen for a signed-in user. Plain users are turned away.
    pub fn new(api: A, role: Role) -> Result<Self, AdminError> {
        if !role.can_manage_content() {
            return Err(AdminError::Forbidden);
        }
        Ok(Self {
            api,
            articles: Vec::new(),
            filter: StatusFilter::All,
            loading: true,
        })
    }

    /// Initial load. On failure the list stays empty and loading still ends.
    pub async fn mount(&mut self) -> Result<(), AdminError> {
        let result = self.api.fetch_articles(ADMIN_FETCH_LIMIT).await;
        self.loading = false;
        self.articles = result?;
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    pub fn all(&self) -> &[ArticleView] {
        &self.articles
    }

    pub fn visible(&self) -> Vec<&ArticleView> {
        self.articles
            .iter()
            .filter(|a| self.filter.matches(a.status))
            .collect()
    }

    /// Asks `confirm` first; a refusal sends nothing. The row is dropped from
    /// the local list only once the server reports success.
    pub async fn delete(
        &mut self,
        id: Uuid,
        confirm: impl FnOnce() -> bool,
    ) -> Result<DeleteOutcome, AdminError> {
        if !confirm() {
            return Ok(DeleteOutcome::Cancelled);
        }
        self.api.delete_article(id).await?;
        self.articles.retain(|a| a.id != id);
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    fn article(status: ArticleStatus) -> ArticleView {
        let now = Utc::now();
        ArticleView {
            id: Uuid::new_v4(),
            title: format!("{status:?} story"),
            slug: Uuid::new_v4().to_string(),
            content: String::new(),
            excerpt: None,
            featured_image: None,
            status,
            is_premium: false,
            views: 0,
            published_at: None,
            meta_description: None,
            meta_keywords: None,
            canonical_url: None,
            author: None,
            category: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[derive(Default)]
    struct FakeApi {
        articles: Vec<ArticleView>,
        fail_deletes: bool,
        fail_fetch: bool,
        deleted: Mutex<Vec<Uuid>>,
        fetched_with: Mutex<Option<i64>>,
    }

    #[async_trait]
    impl ArticleApi for FakeApi {
        async fn fetch_articles(&self, limit: i64) -> Result<Vec<ArticleView>, AdminError> {
            *self.fetched_with.lock().unwrap() = Some(limit);
            if self.fail_fetch {
                return Err(AdminError::Api {
                    status: 500,
                    message: "Something went wrong".into(),
                });
            }
            Ok(self.articles.clone())
        }

        async fn delete_article(&self, id: Uuid) -> Result<(), AdminError> {
            if self.fail_deletes {
                return Err(AdminError::Api {
                    status: 404,
                    message: "Article not found".into(),
                });
            }
            self.deleted.lock().unwrap().push(id);
            Ok(())
        }
    }

    #[test]
    fn plain_users_are_turned_away() {
        assert!(matches!(
            ArticleManager::new(FakeApi::default(), Role::User),
            Err(AdminError::Forbidden)
        ));
        assert!(ArticleManager::new(FakeApi::default(), Role::Author).is_ok());
    }

    #[tokio::test]
    async fn mount_loads_one_hundred_and_filters_locally() {
        let api = FakeApi {
            articles: vec![
                article(ArticleStatus::Published),
                article(ArticleStatus::Draft),
                article(ArticleStatus::Scheduled),
                article(ArticleStatus::Archived),
            ],
            ..Default::default()
        };
        let mut manager = ArticleManager::new(api, Role::Admin).unwrap();
        assert!(manager.is_loading());
        manager.mount().await.unwrap();
        assert!(!manager.is_loading());
        assert_eq!(*manager.api.fetched_with.lock().unwrap(), Some(ADMIN_FETCH_LIMIT));

        assert_eq!(manager.visible().len(), 4);
        manager.set_filter("draft".parse().unwrap());
        let visible = manager.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].status, ArticleStatus::Draft);
        manager.set_filter(StatusFilter::Scheduled);
        assert_eq!(manager.visible().len(), 1);
        assert_eq!(manager.all().len(), 4);
    }

    #[tokio::test]
    async fn failed_mount_still_finishes_loading() {
        let api = FakeApi {
            fail_fetch: true,
            ..Default::default()
        };
        let mut manager = ArticleManager::new(api, Role::Admin).unwrap();
        assert!(manager.mount().await.is_err());
        assert!(!manager.is_loading());
        assert!(manager.all().is_empty());
    }

    #[tokio::test]
    async fn declined_confirmation_sends_nothing() {
        let target = article(ArticleStatus::Draft);
        let id = target.id;
        let api = FakeApi {
            articles: vec![target],
            ..Default::default()
        };
        let mut manager = ArticleManager::new(api, Role::Author).unwrap();
        manager.mount().await.unwrap();

        let outcome = manager.delete(id, || false).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert!(manager.api.deleted.lock().unwrap().is_empty());
        assert_eq!(manager.all().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_delete_removes_the_row_without_refetching() {
        let keep = article(ArticleStatus::Published);
        let gone = article(ArticleStatus::Draft);
        let id = gone.id;
        let api = FakeApi {
            articles: vec![keep, gone],
            ..Default::default()
        };
        let mut manager = ArticleManager::new(api, Role::Admin).unwrap();
        manager.mount().await.unwrap();

        assert_eq!(manager.delete(id, || true).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(manager.all().len(), 1);
        assert!(manager.all().iter().all(|a| a.id != id));
        assert_eq!(*manager.api.deleted.lock().unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_row() {
        let target = article(ArticleStatus::Draft);
        let id = target.id;
        let api = FakeApi {
            articles: vec![target],
            fail_deletes: true,
            ..Default::default()
        };
        let mut manager = ArticleManager::new(api, Role::Admin).unwrap();
        manager.mount().await.unwrap();

        let err = manager.delete(id, || true).await.unwrap_err();
        assert!(matches!(err, AdminError::Api { status: 404, .. }));
        assert_eq!(manager.all().len(), 1);
    }
}
