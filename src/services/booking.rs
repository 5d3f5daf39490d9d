use anyhow::Context;
use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries::{self, AppointmentScope};
use crate::models::{Actor, Appointment, AppointmentStatus, AppointmentView, Capability, Role};
use crate::services::scheduling::{require_bookable_service, require_doctor, SchedulingError};
use crate::services::working_hours;

const MAX_NOTES_LEN: usize = 2000;

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub doctor_id: String,
    pub service_id: String,
    pub start: NaiveDateTime,
    pub notes: Option<String>,
}

/// Validates and inserts a scheduled appointment. The overlap check and the
/// insert share one IMMEDIATE transaction, so concurrent requests for the same
/// doctor cannot both pass the check.
pub fn create_appointment(
    conn: &mut Connection,
    actor: &Actor,
    request: BookingRequest,
) -> Result<Appointment, SchedulingError> {
    if !actor.can(Capability::BookAppointment) {
        return Err(SchedulingError::Authorization(
            "only patients can book appointments".into(),
        ));
    }

    let notes = request
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(SchedulingError::Validation(format!(
            "notes must be at most {MAX_NOTES_LEN} characters"
        )));
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin booking transaction")?;

    require_doctor(&tx, &request.doctor_id)?;
    let service = require_bookable_service(&tx, &request.service_id)?;
    let hours = working_hours::load(&tx, &request.doctor_id)?;

    let start = request.start.with_nanosecond(0).unwrap_or(request.start);
    let end = start
        .checked_add_signed(Duration::minutes(service.duration_minutes as i64))
        .ok_or_else(|| SchedulingError::Validation(format!("start time {start} is out of range")))?;

    if !hours.contains(&start, &end) {
        tracing::warn!(
            doctor_id = %request.doctor_id,
            %start,
            %end,
            "booking outside working hours"
        );
        let available = hours.to_human_readable();
        return Err(SchedulingError::Validation(if available.is_empty() {
            "the doctor has no working hours configured".to_string()
        } else {
            format!("requested time is outside the doctor's working hours ({available})")
        }));
    }

    if let Some(existing) =
        queries::get_scheduled_in_range(&tx, &request.doctor_id, &start, &end)?.first()
    {
        tracing::warn!(
            doctor_id = %request.doctor_id,
            conflicting = %existing.id,
            %start,
            "booking conflicts with existing appointment"
        );
        return Err(SchedulingError::Conflict {
            appointment_id: existing.id.clone(),
        });
    }

    let now = Utc::now().naive_utc();
    let appointment = Appointment {
        id: uuid::Uuid::new_v4().to_string(),
        patient_id: actor.id.clone(),
        doctor_id: request.doctor_id,
        service_id: service.id,
        appointment_start: start,
        appointment_end: end,
        status: AppointmentStatus::Scheduled,
        notes,
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = queries::create_appointment(&tx, &appointment) {
        // The overlap trigger is the last line; surface it as a conflict too.
        if is_overlap_abort(&e) {
            let existing = queries::get_scheduled_in_range(
                &tx,
                &appointment.doctor_id,
                &start,
                &end,
            )?;
            return Err(SchedulingError::Conflict {
                appointment_id: existing
                    .first()
                    .map(|a| a.id.clone())
                    .unwrap_or_default(),
            });
        }
        return Err(e.into());
    }
    tx.commit().context("failed to commit booking")?;

    tracing::info!(
        appointment_id = %appointment.id,
        doctor_id = %appointment.doctor_id,
        patient_id = %appointment.patient_id,
        start = %appointment.appointment_start,
        "appointment booked"
    );
    Ok(appointment)
}

fn is_overlap_abort(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(_, Some(msg))) if msg.contains("appointment overlap")
    )
}

/// Booking patient or assigned doctor only; scheduled -> cancelled.
pub fn cancel_appointment(
    conn: &mut Connection,
    appointment_id: &str,
    actor: &Actor,
) -> Result<Appointment, SchedulingError> {
    transition(conn, appointment_id, actor, AppointmentStatus::Cancelled)
}

/// Assigned doctor only; scheduled -> completed.
pub fn complete_appointment(
    conn: &mut Connection,
    appointment_id: &str,
    actor: &Actor,
) -> Result<Appointment, SchedulingError> {
    transition(conn, appointment_id, actor, AppointmentStatus::Completed)
}

fn transition(
    conn: &mut Connection,
    appointment_id: &str,
    actor: &Actor,
    target: AppointmentStatus,
) -> Result<Appointment, SchedulingError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin status transaction")?;

    let appointment = queries::get_appointment(&tx, appointment_id)?
        .ok_or_else(|| SchedulingError::NotFound(format!("appointment {appointment_id}")))?;

    let permitted = match target {
        AppointmentStatus::Cancelled => {
            actor.id == appointment.patient_id || actor.id == appointment.doctor_id
        }
        AppointmentStatus::Completed => {
            actor.role == Role::Doctor && actor.id == appointment.doctor_id
        }
        AppointmentStatus::Scheduled => false,
    };
    if !permitted {
        tracing::warn!(
            appointment_id,
            actor_id = %actor.id,
            target = target.as_str(),
            "status change refused"
        );
        return Err(SchedulingError::Authorization(format!(
            "not allowed to mark appointment {appointment_id} as {}",
            target.as_str()
        )));
    }

    if !appointment.status.can_transition_to(target)
        || !queries::update_appointment_status(
            &tx,
            appointment_id,
            AppointmentStatus::Scheduled,
            target,
        )?
    {
        return Err(SchedulingError::InvalidState(format!(
            "appointment {appointment_id} is already {}",
            appointment.status.as_str()
        )));
    }

    let updated = queries::get_appointment(&tx, appointment_id)?
        .ok_or_else(|| SchedulingError::NotFound(format!("appointment {appointment_id}")))?;
    tx.commit().context("failed to commit status change")?;

    tracing::info!(
        appointment_id,
        actor_id = %actor.id,
        status = updated.status.as_str(),
        "appointment status changed"
    );
    Ok(updated)
}

/// Patients see their own, doctors their assigned, admins everything.
pub fn list_appointments(
    conn: &Connection,
    actor: &Actor,
) -> Result<Vec<AppointmentView>, SchedulingError> {
    let scope = match actor.role {
        Role::Patient => AppointmentScope::Patient(&actor.id),
        Role::Doctor => AppointmentScope::Doctor(&actor.id),
        Role::Admin => AppointmentScope::All,
    };
    Ok(queries::list_appointment_views(conn, scope)?)
}
