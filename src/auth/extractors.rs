use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::claims::Claims;
use crate::error::AppError;

/// Caller identity attached by [`require_token`](super::middleware::require_token).
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .map(|claims| AuthUser(claims.user_id))
            .ok_or(AppError::Unauthenticated("Access denied. No token provided."))
    }
}
