use rusqlite::Connection;

use crate::db::queries;
use crate::models::working_hours::validate_windows;
use crate::models::{Actor, TimeWindow, WorkingHours};
use crate::services::scheduling::{require_doctor, SchedulingError};

/// Stored windows, or the 09:00-17:00 default when the doctor never configured any.
/// Callers are expected to have checked the doctor exists.
pub fn load(conn: &Connection, doctor_id: &str) -> Result<WorkingHours, SchedulingError> {
    Ok(match queries::get_working_hours(conn, doctor_id)? {
        Some(windows) => WorkingHours::configured(doctor_id, windows),
        None => WorkingHours::default_for(doctor_id),
    })
}

pub fn get_working_hours(
    conn: &Connection,
    doctor_id: &str,
) -> Result<WorkingHours, SchedulingError> {
    require_doctor(conn, doctor_id)?;
    load(conn, doctor_id)
}

pub fn set_working_hours(
    conn: &Connection,
    actor: &Actor,
    doctor_id: &str,
    windows: Vec<TimeWindow>,
) -> Result<WorkingHours, SchedulingError> {
    if !actor.can_manage_schedule_of(doctor_id) {
        tracing::warn!(actor_id = %actor.id, doctor_id, "working hours change refused");
        return Err(SchedulingError::Authorization(
            "only the doctor or an admin can change working hours".into(),
        ));
    }
    require_doctor(conn, doctor_id)?;
    validate_windows(&windows).map_err(SchedulingError::Validation)?;

    let hours = WorkingHours::configured(doctor_id, windows);
    queries::save_working_hours(conn, doctor_id, &hours.windows)?;

    tracing::info!(
        doctor_id,
        actor_id = %actor.id,
        windows = hours.windows.len(),
        "working hours updated"
    );
    Ok(hours)
}
