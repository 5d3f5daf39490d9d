use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::extract::JsonBody;
use crate::models::{DoctorSummary, TimeWindow, WorkingHours};
use crate::services::working_hours;
use crate::state::AppState;

// GET /api/doctors
pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DoctorSummary>>, AppError> {
    let doctors = {
        let db = state.db();
        queries::list_doctors(&db)?
    };
    Ok(Json(doctors.into_iter().map(DoctorSummary::from).collect()))
}

// GET /api/doctors/:id/working-hours
pub async fn get_working_hours(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<WorkingHours>, AppError> {
    let db = state.db();
    Ok(Json(working_hours::get_working_hours(&db, &doctor_id)?))
}

#[derive(Debug, Deserialize)]
pub struct WorkingHoursRequest {
    pub windows: Vec<TimeWindow>,
}

// PUT /api/doctors/:id/working-hours
pub async fn set_working_hours(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(doctor_id): Path<String>,
    JsonBody(payload): JsonBody<WorkingHoursRequest>,
) -> Result<Json<WorkingHours>, AppError> {
    let db = state.db();
    let hours =
        working_hours::set_working_hours(&db, &auth.actor(), &doctor_id, payload.windows)?;
    Ok(Json(hours))
}
