use crate::{
    error::AppError,
    extractors::{IdPath, JsonBody},
    models::{Comment, CommentStatus},
    patch,
    routes::articles::MessageResponse,
    store::{NewComment, SharedStore},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
pub struct CommentListResponse {
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize)]
pub struct CommentEnvelope {
    pub comment: Comment,
}

fn comment_not_found() -> AppError {
    AppError::not_found("Comment not found")
}

pub async fn list_comments(
    State(store): State<SharedStore>,
    IdPath(article_id): IdPath,
) -> Result<Json<CommentListResponse>, AppError> {
    if store.get_article(article_id).await?.is_none() {
        return Err(AppError::not_found("Article not found"));
    }
    let comments = store.list_approved_comments(article_id).await?;
    Ok(Json(CommentListResponse { comments }))
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub user: Option<Uuid>,
    pub parent: Option<Uuid>,
}

/// New comments start out PENDING. A reply must point at a comment on the
/// same article.
pub async fn create_comment(
    State(store): State<SharedStore>,
    IdPath(article_id): IdPath,
    JsonBody(payload): JsonBody<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentEnvelope>), AppError> {
    let (Some(content), Some(user_id)) = (patch::required(payload.content), payload.user) else {
        return Err(AppError::validation("Content and user are required"));
    };

    if store.get_article(article_id).await?.is_none() {
        return Err(AppError::not_found("Article not found"));
    }

    if let Some(parent_id) = payload.parent {
        let parent = store.find_comment(parent_id).await?;
        if parent.is_none_or(|p| p.article_id != article_id) {
            return Err(AppError::validation(
                "Parent comment must belong to the same article",
            ));
        }
    }

    let comment = store
        .insert_comment(NewComment {
            content,
            user_id,
            article_id,
            parent_id: payload.parent,
        })
        .await?;
    info!(comment_id = %comment.id, article_id = %article_id, "comment submitted");

    Ok((StatusCode::CREATED, Json(CommentEnvelope { comment })))
}

#[derive(Deserialize)]
pub struct ModerateCommentRequest {
    pub status: Option<CommentStatus>,
}

pub async fn moderate_comment(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
    JsonBody(payload): JsonBody<ModerateCommentRequest>,
) -> Result<Json<CommentEnvelope>, AppError> {
    let status = payload
        .status
        .ok_or_else(|| AppError::validation("Status is required"))?;

    let comment = store
        .set_comment_status(id, status)
        .await?
        .ok_or_else(comment_not_found)?;
    info!(comment_id = %id, status = ?status, "comment moderated");

    Ok(Json(CommentEnvelope { comment }))
}

pub async fn delete_comment(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, AppError> {
    if !store.delete_comment(id).await? {
        return Err(comment_not_found());
    }
    info!(comment_id = %id, "comment deleted");

    Ok(Json(MessageResponse {
        message: "Comment deleted successfully".to_string(),
    }))
}
