use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::handlers::extract::{JsonBody, QueryParams};
use crate::models::{parse_timestamp, Appointment, AppointmentView};
use crate::services::booking::{self, BookingRequest};
use crate::services::scheduling;
use crate::state::AppState;

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|dt| dt.date()))
        .ok_or_else(|| AppError::Validation(format!("invalid date: {raw}")))
}

fn free_slots(
    state: &AppState,
    doctor_id: &str,
    service_id: &str,
    date: &str,
) -> Result<(i32, Vec<NaiveDateTime>), AppError> {
    let date = parse_date(date)?;
    let db = state.db();
    let (service, slots) = scheduling::available_slots(
        &db,
        doctor_id,
        service_id,
        date,
        state.config.slot_step_minutes,
    )?;
    Ok((service.duration_minutes, slots))
}

// GET /api/appointments/slots
#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub doctor_id: String,
    pub service_id: String,
    pub date: String,
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    QueryParams(q): QueryParams<SlotsQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    let (_, slots) = free_slots(&state, &q.doctor_id, &q.service_id, &q.date)?;
    Ok(Json(
        slots
            .iter()
            .map(|s| s.format(ISO_FORMAT).to_string())
            .collect(),
    ))
}

// GET /api/time-slots/:doctor_id/available
#[derive(Debug, Deserialize)]
pub struct TimeSlotsQuery {
    pub service_id: String,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct TimeSlot {
    pub datetime: String,
    pub time: String,
    pub duration_minutes: i32,
    pub available: bool,
}

pub async fn get_time_slots(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<String>,
    QueryParams(q): QueryParams<TimeSlotsQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let (duration_minutes, slots) = free_slots(&state, &doctor_id, &q.service_id, &q.date)?;
    Ok(Json(
        slots
            .into_iter()
            .map(|s| TimeSlot {
                datetime: s.format(ISO_FORMAT).to_string(),
                time: s.format("%H:%M").to_string(),
                duration_minutes,
                available: true,
            })
            .collect(),
    ))
}

// POST /api/appointments
#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub doctor_id: String,
    pub service_id: String,
    pub appointment_date: String,
    pub notes: Option<String>,
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let start = parse_timestamp(&payload.appointment_date).ok_or_else(|| {
        AppError::Validation(format!(
            "invalid appointment_date: {}",
            payload.appointment_date
        ))
    })?;

    let request = BookingRequest {
        doctor_id: payload.doctor_id,
        service_id: payload.service_id,
        start,
        notes: payload.notes,
    };
    let mut db = state.db();
    Ok(Json(booking::create_appointment(&mut db, &auth.actor(), request)?))
}

// GET /api/appointments/my
pub async fn my_appointments(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    let db = state.db();
    Ok(Json(booking::list_appointments(&db, &auth.actor())?))
}

// PUT /api/appointments/:id/cancel
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let mut db = state.db();
    Ok(Json(booking::cancel_appointment(
        &mut db,
        &appointment_id,
        &auth.actor(),
    )?))
}

// PUT /api/appointments/:id/complete
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let mut db = state.db();
    Ok(Json(booking::complete_appointment(
        &mut db,
        &appointment_id,
        &auth.actor(),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_accepts_plain_and_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        assert_eq!(parse_date("2025-06-16").unwrap(), expected);
        assert_eq!(parse_date("2025-06-16T10:00:00").unwrap(), expected);
        assert!(parse_date("16/06/2025").is_err());
    }
}
