use crate::{
    error::AppError,
    extractors::JsonBody,
    models::Tag,
    patch,
    store::{NewTag, SharedStore},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct TagListResponse {
    pub tags: Vec<Tag>,
}

#[derive(Serialize, Deserialize)]
pub struct TagEnvelope {
    pub tag: Tag,
}

pub async fn list_tags(State(store): State<SharedStore>) -> Result<Json<TagListResponse>, AppError> {
    let tags = store.list_tags().await?;
    Ok(Json(TagListResponse { tags }))
}

#[derive(Deserialize)]
pub struct CreateTagRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
}

pub async fn create_tag(
    State(store): State<SharedStore>,
    JsonBody(payload): JsonBody<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagEnvelope>), AppError> {
    let (Some(name), Some(slug)) = (patch::required(payload.name), patch::required(payload.slug))
    else {
        return Err(AppError::validation("Name and slug are required"));
    };

    let tag = store.insert_tag(NewTag { name, slug }).await?;
    Ok((StatusCode::CREATED, Json(TagEnvelope { tag })))
}
