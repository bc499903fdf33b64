use crate::{
    error::AppError,
    extractors::{IdPath, JsonBody},
    models::{Role, UserSummary},
    password::{self, MIN_PASSWORD_LEN},
    patch::{self, double_option},
    routes::articles::MessageResponse,
    store::{NewUser, SharedStore, UserChanges},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

pub async fn register(
    State(store): State<SharedStore>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let (Some(email), Some(secret)) = (
        patch::required(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Email and password are required"));
    };

    if secret.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let name = patch::required(payload.name)
        .or_else(|| email.split('@').next().map(str::to_string));

    // Argon2 hashing blocks; run it on the blocking pool.
    let password_hash = tokio::task::spawn_blocking(move || password::hash(&secret))
        .await
        .map_err(anyhow::Error::from)??;

    let user = store
        .insert_user(NewUser {
            name,
            email,
            password_hash: Some(password_hash),
            role: Role::User,
        })
        .await?;
    info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user: user.into(),
        }),
    ))
}

#[derive(Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
}

pub async fn list_users(State(store): State<SharedStore>) -> Result<Json<UserListResponse>, AppError> {
    let users = store
        .list_users()
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();
    Ok(Json(UserListResponse { users }))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub name: Option<Option<String>>,
    pub role: Option<Role>,
}

#[derive(Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: UserSummary,
}

pub async fn update_user(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserEnvelope>, AppError> {
    let user = store
        .update_user(
            id,
            UserChanges {
                name: payload.name,
                role: payload.role,
            },
        )
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %id, role = ?user.role, "user updated");

    Ok(Json(UserEnvelope { user: user.into() }))
}

pub async fn delete_user(
    State(store): State<SharedStore>,
    IdPath(id): IdPath,
) -> Result<Json<MessageResponse>, AppError> {
    if !store.delete_user(id).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user_id = %id, "user deleted");

    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}
