use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use bcrypt::verify;
use chrono::{Duration, Utc};
use common::{Credentials, LoginResponse, PublicUser};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::response;
use crate::web_server::AppState;

/// Sessions expire exactly seven days after issuance.
pub const TOKEN_TTL_DAYS: i64 = 7;

// --- User & Claims Structs ---

#[derive(sqlx::FromRow, Debug)]
pub struct AdminAccount {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
}

impl From<AdminAccount> for PublicUser {
    fn from(account: AdminAccount) -> Self {
        PublicUser {
            id: account.id,
            username: account.username,
            email: account.email,
            full_name: account.full_name,
            role: account.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    pub iat: i64, // Issued at
    pub exp: i64, // Expiration time
}

// --- Token Codec ---

/// Signs a session token for the given account, expiring [`TOKEN_TTL_DAYS`]
/// after issuance.
pub fn issue_token(account: &AdminAccount, secret: &str) -> Result<String, AppError> {
    let issued_at = Utc::now();
    let claims = Claims {
        user_id: account.id,
        username: account.username.clone(),
        role: account.role.clone(),
        iat: issued_at.timestamp(),
        exp: (issued_at + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| {
        tracing::error!("Failed to sign session token: {}", e);
        AppError::Internal("Token creation error".to_string())
    })
}

/// Verifies a session token, distinguishing an expired token from any
/// other failure so clients can prompt for a fresh login.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".to_string())
        }
        _ => AppError::Unauthorized("Invalid token".to_string()),
    })
}

/// Pulls a token from the request headers. The admin panel sends
/// `X-Auth-Token`; `Authorization: Bearer` is the fallback.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get("x-auth-token")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        return Some(token.to_owned());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
}

// --- API Handlers ---

/// ## Log in an admin user
/// Verifies the credentials and returns a signed session token together
/// with the user's public profile.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Unknown, inactive or wrongly authenticated user"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<Value>, AppError> {
    let username = payload.username.trim();
    let password = payload.password.trim();

    if username.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    tracing::info!("Login attempt for user: {}", username);

    let account: AdminAccount = sqlx::query_as(
        "SELECT id, username, password_hash, email, full_name, role, is_active \
         FROM admin_users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    if !account.is_active {
        return Err(AppError::Unauthorized("User is not active".to_string()));
    }

    let password_matches = verify(password, &account.password_hash).map_err(|e| {
        tracing::error!("Password verification failed for {}: {}", username, e);
        AppError::Internal(format!("Password check error: {e}"))
    })?;

    if !password_matches {
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    sqlx::query(
        "UPDATE admin_users SET last_login_at = CURRENT_TIMESTAMP, \
         updated_at = CURRENT_TIMESTAMP WHERE id = $1",
    )
    .bind(account.id)
    .execute(&state.db_pool)
    .await?;

    let token = issue_token(&account, &state.config.jwt.secret)?;

    Ok(response::ok(LoginResponse {
        token,
        user: account.into(),
    }))
}

/// ## Identify the current session
/// Verifies the bearer token and re-fetches the user from the store, so a
/// deactivated account is locked out even while its token is unexpired.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user profile", body = PublicUser),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    let claims = decode_token(token, &state.config.jwt.secret)?;

    let user: PublicUser = sqlx::query_as(
        "SELECT id, username, email, full_name, role \
         FROM admin_users WHERE id = $1 AND is_active = TRUE",
    )
    .bind(claims.user_id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;

    Ok(response::ok(json!({ "user": user })))
}
