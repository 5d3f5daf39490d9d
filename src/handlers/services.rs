use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::handlers::extract::JsonBody;
use crate::models::{Service, ServiceInput};
use crate::services::catalog;
use crate::state::AppState;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db();
    Ok(Json(catalog::list_services(&db)?))
}

// POST /api/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<ServiceInput>,
) -> Result<Json<Service>, AppError> {
    let db = state.db();
    Ok(Json(catalog::create_service(&db, &auth.actor(), payload)?))
}

// PUT /api/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(service_id): Path<String>,
    JsonBody(payload): JsonBody<ServiceInput>,
) -> Result<Json<Service>, AppError> {
    let db = state.db();
    Ok(Json(catalog::update_service(
        &db,
        &auth.actor(),
        &service_id,
        payload,
    )?))
}
