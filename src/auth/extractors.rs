use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo;
use crate::users::repo_types::{PublicUser, Role};

/// Resolves the bearer token on a protected request to the calling user.
///
/// Verifies the token, then looks the subject up through the read-through
/// cache. A valid token whose account has since been deleted is NotFound.
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Access token required".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Access token required".into()))?;

        let claims = state.jwt.verify(token)?;

        let user = repo::find_public_by_id(&state.db, &state.cache, claims.sub)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        Ok(CurrentUser(user))
    }
}

/// Like [`CurrentUser`], but only admits ADMIN accounts.
pub struct AdminUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
