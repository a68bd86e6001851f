use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Identity taken from a verified bearer token.
///
/// Handlers that take this extractor never run for unauthenticated requests.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated("No token provided".into()))?;

        // Expect "Bearer <token>"
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthenticated("No token provided".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token.trim()).map_err(|e| {
            warn!("invalid or expired token");
            e
        })?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}
