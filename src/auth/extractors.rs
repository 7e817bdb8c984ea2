use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{cookies, jwt::JwtKeys};
use crate::error::ApiError;

/// Authenticated caller, taken from the `accessToken` cookie or a bearer header.
pub struct AuthUser(pub Uuid);

fn bearer(parts: &Parts) -> Option<&str> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = cookies::read_cookie(&parts.headers, cookies::ACCESS_COOKIE)
            .or_else(|| bearer(&*parts))
            .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(token).map_err(|e| {
            warn!(error = %e, "access token rejected");
            ApiError::unauthorized("Invalid access token")
        })?;

        Ok(AuthUser(claims.sub))
    }
}
