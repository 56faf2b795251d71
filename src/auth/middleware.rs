use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{
    auth::jwt::{JwtKeys, TokenError},
    error::AppError,
};

/// Auth gate: the raw token travels in `Authorization` (no `Bearer` scheme).
/// A missing token is 401, a bad or expired one 403. On success the decoded
/// `Claims` are attached to the request extensions.
pub async fn require_token(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Unauthenticated("Access denied. No token provided."))?;

    let claims = header
        .to_str()
        .map_err(|_| TokenError::InvalidSignature)
        .and_then(|token| keys.verify(token.trim()))
        .map_err(|e| {
            warn!(error = %e, "rejected token");
            AppError::Forbidden("Invalid token.")
        })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
