use crate::error::AppError;
use crate::models::ArticleStatus;
use crate::store::{ArticleFilter, PageWindow};
use serde::de::IntoDeserializer;
use serde::de::value::{Error as ValueError, StrDeserializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

// Empty query values (`?status=`) are treated the same as a missing key.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

// Same spelling as the JSON wire format.
fn parse_status(raw: &str) -> Result<ArticleStatus, AppError> {
    let de: StrDeserializer<'_, ValueError> = raw.into_deserializer();
    ArticleStatus::deserialize(de).map_err(|e| AppError::validation(format!("Invalid status: {e}")))
}

fn parse_positive(name: &str, value: &Option<String>, default: i64) -> Result<i64, AppError> {
    match non_empty(value) {
        None => Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(AppError::validation(format!(
                "{name} must be a positive integer"
            ))),
        },
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct PaginationParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PaginationParams {
    pub fn page(&self) -> Result<i64, AppError> {
        parse_positive("page", &self.page, DEFAULT_PAGE)
    }

    /// Requested page size, clamped to `max` when a cap is configured.
    pub fn limit(&self, max: Option<i64>) -> Result<i64, AppError> {
        let limit = parse_positive("limit", &self.limit, DEFAULT_LIMIT)?;
        Ok(match max {
            Some(max) if max >= 1 => limit.min(max),
            _ => limit,
        })
    }

    pub fn window(&self, max: Option<i64>) -> Result<PageWindow, AppError> {
        let page = self.page()?;
        let limit = self.limit(max)?;
        Ok(PageWindow {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        })
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ArticleListParams {
    #[serde(flatten)]
    pub pagination: PaginationParams,
    pub status: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "isPremium")]
    pub is_premium: Option<String>,
    pub search: Option<String>,
}

impl ArticleListParams {
    pub fn window(&self, max: Option<i64>) -> Result<PageWindow, AppError> {
        self.pagination.window(max)
    }

    pub fn filter(&self) -> Result<ArticleFilter, AppError> {
        let status = non_empty(&self.status).map(parse_status).transpose()?;

        let category_id = non_empty(&self.category)
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AppError::validation("category must be a valid id"))?;

        Ok(ArticleFilter {
            status,
            category_id,
            is_premium: non_empty(&self.is_premium).map(|v| v == "true"),
            search: non_empty(&self.search).map(str::to_string),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(window: PageWindow, total: i64) -> Self {
        Self {
            page: window.page,
            limit: window.limit,
            total,
            pages: if total == 0 { 0 } else { (total - 1) / window.limit + 1 },
        }
    }
}
