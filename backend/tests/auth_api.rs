use backend::auth::{Claims, TOKEN_TTL_DAYS};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use serde_json::{json, Value};

mod helpers;
use crate::helpers::TEST_JWT_SECRET;

#[tokio::test]
async fn test_login_and_whoami_flow() {
    Lazy::force(&helpers::TRACING);
    let (addr, client, _db_pool) = helpers::spawn_app().await;

    let user_id = helpers::create_admin_user(&addr, &client, "alice", "password123", "admin").await;

    // Login returns the token plus the public profile, never the hash.
    let response = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({ "username": "alice", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(true));
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(!token.is_empty());
    assert_eq!(body["data"]["user"]["id"], json!(user_id));
    assert_eq!(body["data"]["user"]["username"], json!("alice"));
    assert_eq!(body["data"]["user"]["email"], json!("alice@example.com"));
    assert_eq!(body["data"]["user"]["role"], json!("admin"));
    assert!(body["data"]["user"].get("password_hash").is_none());

    // Whoami re-fetches the same profile from the store.
    let response = client
        .get(format!("http://{addr}/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["id"], json!(user_id));
    assert_eq!(body["data"]["user"]["username"], json!("alice"));
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_validation_and_unknown_user() {
    Lazy::force(&helpers::TRACING);
    let (addr, client, _db_pool) = helpers::spawn_app().await;

    let login_url = format!("http://{addr}/api/auth/login");

    // Empty credentials are a validation error, not an auth failure.
    let response = client
        .post(&login_url)
        .json(&json!({ "username": "", "password": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["error"], json!("Username and password are required"));

    let response = client
        .post(&login_url)
        .json(&json!({ "username": "ghost", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("User not found"));
}

#[tokio::test]
async fn test_password_reset_flow() {
    Lazy::force(&helpers::TRACING);
    let (addr, client, _db_pool) = helpers::spawn_app().await;

    helpers::create_admin_user(&addr, &client, "bob", "secret123", "admin").await;

    let login_url = format!("http://{addr}/api/auth/login");

    // Wrong password is rejected.
    let response = client
        .post(&login_url)
        .json(&json!({ "username": "bob", "password": "wrongpassword" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Invalid password"));

    // Correct password logs in and whoami sees bob.
    let token = helpers::login(&addr, &client, "bob", "secret123").await;
    let response = client
        .get(format!("http://{addr}/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["user"]["username"], json!("bob"));

    // Administrative reset, no old-password check.
    let response = client
        .post(format!("http://{addr}/api/users/reset-password"))
        .json(&json!({ "username": "bob", "new_password": "freshsecret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["data"]["message"],
        json!("Password for user bob has been reset successfully")
    );

    // Old password no longer works, the new one does.
    let response = client
        .post(&login_url)
        .json(&json!({ "username": "bob", "password": "secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    helpers::login(&addr, &client, "bob", "freshsecret").await;
}

#[tokio::test]
async fn test_inactive_user_is_revoked() {
    Lazy::force(&helpers::TRACING);
    let (addr, client, db_pool) = helpers::spawn_app().await;

    helpers::create_admin_user(&addr, &client, "carol", "password123", "admin").await;
    let token = helpers::login(&addr, &client, "carol", "password123").await;

    sqlx::query("UPDATE admin_users SET is_active = FALSE WHERE username = $1")
        .bind("carol")
        .execute(&db_pool)
        .await
        .unwrap();

    // Login is refused outright.
    let response = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({ "username": "carol", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("User is not active"));

    // A token issued before deactivation is dead too: whoami re-checks
    // the store instead of trusting the claims.
    let response = client
        .get(format!("http://{addr}/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("User not found or inactive"));
}

#[tokio::test]
async fn test_whoami_token_errors_are_distinct() {
    Lazy::force(&helpers::TRACING);
    let (addr, client, _db_pool) = helpers::spawn_app().await;

    helpers::create_admin_user(&addr, &client, "dave", "password123", "admin").await;

    let me_url = format!("http://{addr}/api/auth/me");

    // Missing header.
    let response = client.get(&me_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("No token provided"));

    // Malformed token.
    let response = client
        .get(&me_url)
        .bearer_auth("this-is-not-a-valid-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Invalid token"));

    // Expired but otherwise well-formed token.
    let issued_at = Utc::now() - Duration::days(TOKEN_TTL_DAYS) - Duration::minutes(5);
    let claims = Claims {
        user_id: 1,
        username: "dave".to_string(),
        role: "admin".to_string(),
        iat: issued_at.timestamp(),
        exp: (issued_at + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };
    let expired_token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_ref()),
    )
    .unwrap();

    let response = client
        .get(&me_url)
        .bearer_auth(expired_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Token expired"));
}

#[tokio::test]
async fn test_create_user_validation_and_uniqueness() {
    Lazy::force(&helpers::TRACING);
    let (addr, client, _db_pool) = helpers::spawn_app().await;

    let users_url = format!("http://{addr}/api/users");

    // Required fields.
    let response = client
        .post(&users_url)
        .json(&json!({ "username": "erin", "email": "", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        json!("Username, email and password are required")
    );

    // Email format.
    let response = client
        .post(&users_url)
        .json(&json!({ "username": "erin", "email": "not-an-email", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // First creation succeeds, the duplicate is rejected.
    helpers::create_admin_user(&addr, &client, "erin", "password123", "admin").await;

    let response = client
        .post(&users_url)
        .json(&json!({
            "username": "erin",
            "email": "erin2@example.com",
            "password": "otherpassword",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Username already exists"));
}

#[tokio::test]
async fn test_reset_password_validation() {
    Lazy::force(&helpers::TRACING);
    let (addr, client, _db_pool) = helpers::spawn_app().await;

    let reset_url = format!("http://{addr}/api/users/reset-password");

    let response = client
        .post(&reset_url)
        .json(&json!({ "username": "ghost", "new_password": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Username and new_password are required"));

    let response = client
        .post(&reset_url)
        .json(&json!({ "username": "ghost", "new_password": "freshsecret" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("User not found"));
}
