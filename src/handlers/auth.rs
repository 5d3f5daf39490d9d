use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::handlers::extract::JsonBody;
use crate::models::User;
use crate::services::accounts::{self, RegisterRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

fn issue(state: &AppState, user: User) -> Result<Json<AuthResponse>, AppError> {
    let access_token = state.jwt.sign(&user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        token_type: "bearer",
        user,
    }))
}

// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = {
        let db = state.db();
        accounts::register(&db, payload)?
    };
    issue(&state, user)
}

// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = {
        let db = state.db();
        accounts::authenticate(&db, &payload.email, &payload.password)?
    };
    issue(&state, user)
}

// GET /api/users/me
pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
