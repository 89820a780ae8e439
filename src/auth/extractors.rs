use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde_json::json;
use tracing::warn;

use super::{claims::Identity, jwt::JwtKeys};
use crate::{
    activity::{ActivityLog, ActivityRecord},
    error::AppError,
    extract::ClientInfo,
};

/// Extracts and validates the bearer token, yielding the caller's identity.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::Unauthenticated("Authentication required"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid token attempt");
            AppError::Unauthenticated("Invalid or expired token")
        })?;

        Ok(AuthUser(claims.into()))
    }
}

/// Like [`AuthUser`] but also requires the admin role.
pub struct AdminUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    ActivityLog: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        if identity.is_admin() {
            return Ok(AdminUser(identity));
        }

        warn!(user_id = identity.id, path = %parts.uri.path(), "unauthorized admin access attempt");
        let client = ClientInfo::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        ActivityLog::from_ref(state).record(
            ActivityRecord::new(identity.id, "admin_access_denied")
                .details(json!({ "method": parts.method.as_str(), "path": parts.uri.path() }))
                .client(&client),
        );
        Err(AppError::Forbidden("Admin access required"))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
