use crate::{auth, error::AppError, web_server::AppState};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Claims of an authenticated admin session.
///
/// Extracting this from a request performs the whole write-side gate:
/// 401 when no token can be found or it fails verification, 403 when the
/// token is valid but carries a non-admin role. Handlers that take an
/// `AdminUser` argument are therefore admin-only.
#[derive(Clone, Debug)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = auth::extract_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let claims = auth::decode_token(&token, &state.config.jwt.secret)?;

        if claims.role != "admin" {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser {
            id: claims.user_id,
            username: claims.username,
            role: claims.role,
        })
    }
}
