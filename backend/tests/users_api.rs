#[macro_use]
mod common;

use common::TestApp;
use serde_json::json;

async fn register_creates_a_plain_user(app: TestApp) {
    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "email": "ada@example.com", "password": "analytical" }),
        )
        .await;
    assert_eq!(status, 201, "{body}");
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "ada");
    assert_eq!(body["user"]["role"], "USER");
    assert!(body["user"].get("password").is_none());
}

async fn register_validates_credentials(app: TestApp) {
    let (status, body) = app
        .post("/api/auth/register", json!({ "email": "x@example.com" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Email and password are required");

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "email": "x@example.com", "password": "12345" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Password must be at least 6 characters");

    let (_, body) = app.get("/api/users").await;
    assert!(body["users"].as_array().unwrap().is_empty());
}

async fn register_rejects_a_taken_email(app: TestApp) {
    app.seed_author("taken@example.com").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({ "email": "taken@example.com", "password": "another1" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "User with this email already exists");

    let (_, body) = app.get("/api/users").await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
}

async fn users_can_be_promoted_renamed_and_removed(app: TestApp) {
    let id = app.seed_author("editor@example.com").await;
    let path = format!("/api/users/{id}");

    let (status, body) = app.put(&path, json!({ "role": "AUTHOR" })).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["user"]["role"], "AUTHOR");
    assert_eq!(body["user"]["name"], "Reporter");

    let (status, body) = app.put(&path, json!({ "name": "Desk Editor" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["name"], "Desk Editor");
    assert_eq!(body["user"]["role"], "AUTHOR");

    let (status, _) = app.put(&path, json!({ "role": "OWNER" })).await;
    assert_eq!(status, 400);

    let (status, body) = app.delete(&path).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, body) = app.put(&path, json!({ "name": "Ghost" })).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "User not found");
}

on_every_backend!(
    register_creates_a_plain_user,
    register_validates_credentials,
    register_rejects_a_taken_email,
    users_can_be_promoted_renamed_and_removed,
);
