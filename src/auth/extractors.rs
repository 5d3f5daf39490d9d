use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Actor, User};
use crate::state::AppState;

/// The authenticated caller, loaded fresh from the users table.
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("invalid auth scheme".into()))?;

        let claims = state.jwt.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "rejected bearer token");
            AppError::Unauthorized("invalid or expired token".into())
        })?;

        let user = {
            let db = state.db();
            queries::get_user(&db, &claims.sub)?
        };

        user.map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("user no longer exists".into()))
    }
}
