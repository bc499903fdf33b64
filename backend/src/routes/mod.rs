pub mod articles;
pub mod categories;
pub mod comments;
pub mod tags;
pub mod users;

use crate::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/articles", article_routes())
        .nest("/api/categories", category_routes())
        .nest("/api/tags", tag_routes())
        .nest("/api/users", user_routes())
        .nest("/api/comments", comment_routes())
        .route("/api/auth/register", post(users::register))
        .with_state(state)
}

pub fn article_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(articles::list_articles).post(articles::create_article))
        .route("/slug/{slug}", get(articles::get_published_article))
        .route(
            "/{id}",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route("/{id}/related", get(articles::related_articles))
        .route(
            "/{id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
}

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/slug/{slug}", get(categories::get_category_by_slug))
        .route(
            "/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
}

pub fn tag_routes() -> Router<AppState> {
    Router::new().route("/", get(tags::list_tags).post(tags::create_tag))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route("/{id}", put(users::update_user).delete(users::delete_user))
}

pub fn comment_routes() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        put(comments::moderate_comment).delete(comments::delete_comment),
    )
}
