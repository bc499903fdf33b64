use crate::{
    error::AppError,
    extractors::{IdPath, JsonBody},
    models::Category,
    patch::{self, double_option},
    routes::articles::MessageResponse,
    store::{CategoryChanges, NewCategory, SharedStore},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Serialize, Deserialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

#[derive(Serialize, Deserialize)]
pub struct CategoryEnvelope {
    pub category: Category,
}

fn category_not_found() -> AppError {
    AppError::not_found("Category not found")
}

pub async fn list_categories(
    State(store): State<SharedStore>,
) -> Result<Json<CategoryListResponse>, AppError> {
    let categories = store.list_categories().await?;
    Ok(Json(CategoryListResponse { categories }))
}

pub async fn get_category_by_slug(
    State(store): State<SharedStore>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryEnvelope>, AppError> {
    let category = store
        .find_category_by_slug(&slug)
        .await?
        .ok_or_else(category_not_found)?;
    Ok(Json(CategoryEnvelope { category }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub display_order: Option<i32>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

pub async fn create_category(
    State(store): State<SharedStore>,
    JsonBody(payload): JsonBody<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryEnvelope>), AppError> {
    let (Some(name), Some(slug)) = (patch::required(payload.name), patch::required(payload.slug))
    else {
        return Err(AppError::validation("Name and slug are required"));
    };

    let category = store
        .insert_category(NewCategory {
            name,
            slug,
            description: payload.description,
            icon: payload.icon,
            display_order: payload.display_order.unwrap_or(0),
            meta_title: payload.meta_title,
            meta_description: payload.meta_description,
        })
        .await?;
    info!(category_id = %category.id, slug = %category.slug, "category created");

    Ok((StatusCode::CREATED, Json(CategoryEnvelope { category })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    pub display_order: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta_description: Option<Option<String>>,
}

pub async fn update_category(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
    JsonBody(payload): JsonBody<UpdateCategoryRequest>,
) -> Result<Json<CategoryEnvelope>, AppError> {
    let changes = CategoryChanges {
        name: patch::non_blank("name", payload.name)?,
        slug: patch::non_blank("slug", payload.slug)?,
        description: payload.description,
        icon: payload.icon,
        display_order: payload.display_order,
        meta_title: payload.meta_title,
        meta_description: payload.meta_description,
    };

    let category = store
        .update_category(id, changes)
        .await?
        .ok_or_else(category_not_found)?;
    info!(category_id = %id, slug = %category.slug, "category updated");

    Ok(Json(CategoryEnvelope { category }))
}

pub async fn delete_category(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, AppError> {
    if !store.delete_category(id).await? {
        return Err(category_not_found());
    }
    info!(category_id = %id, "category deleted");

    Ok(Json(MessageResponse {
        message: "Category deleted successfully".to_string(),
    }))
}
