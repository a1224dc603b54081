use axum::{extract::State, http::StatusCode, Json};
use bcrypt::{hash, DEFAULT_COST};
use common::PublicUser;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;
use crate::response;
use crate::web_server::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "admin".to_string()
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub new_password: String,
}

/// ## Provision an admin user
/// Hashes the password and inserts the account inside a transaction; a
/// duplicate username is rejected before anything is written.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "User created", body = PublicUser),
        (status = 400, description = "Missing fields or username already exists"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(mut payload): Json<CreateUserPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_string();
    payload.password = payload.password.trim().to_string();
    payload.full_name = payload.full_name.trim().to_string();
    payload.role = payload.role.trim().to_string();

    if payload.username.is_empty() || payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Username, email and password are required".to_string(),
        ));
    }

    payload.validate()?;

    tracing::info!("Creating admin user: {}", payload.username);

    let mut tx = state.db_pool.begin().await?;

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM admin_users WHERE username = $1")
            .bind(&payload.username)
            .fetch_optional(&mut *tx)
            .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AppError::Internal("Password hashing error".to_string())
    })?;

    let user: PublicUser = sqlx::query_as(
        "INSERT INTO admin_users (username, email, password_hash, full_name, role, is_active) \
         VALUES ($1, $2, $3, $4, $5, TRUE) \
         RETURNING id, username, email, full_name, role",
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.full_name)
    .bind(&payload.role)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, response::ok(json!({ "user": user }))))
}

/// ## Reset an admin user's password
/// Administrative recovery operation: overwrites the stored hash without
/// checking the old password.
#[utoipa::path(
    post,
    path = "/api/users/reset-password",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Missing username or new_password"),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<Value>, AppError> {
    let username = payload.username.trim();
    let new_password = payload.new_password.trim();

    if username.is_empty() || new_password.is_empty() {
        return Err(AppError::Validation(
            "Username and new_password are required".to_string(),
        ));
    }

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM admin_users WHERE username = $1")
            .bind(username)
            .fetch_optional(&state.db_pool)
            .await?;

    if existing.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let password_hash = hash(new_password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        AppError::Internal("Password hashing error".to_string())
    })?;

    sqlx::query(
        "UPDATE admin_users SET password_hash = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE username = $2",
    )
    .bind(&password_hash)
    .bind(username)
    .execute(&state.db_pool)
    .await?;

    tracing::info!("Password reset for user: {}", username);

    Ok(response::ok(json!({
        "message": format!("Password for user {username} has been reset successfully")
    })))
}
