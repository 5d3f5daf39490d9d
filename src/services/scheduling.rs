use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Appointment, AppointmentStatus, Role, Service, User, WorkingHours};
use crate::services::working_hours;

/// Upper bound for a configured slot step: one day.
pub const MAX_SLOT_STEP_MINUTES: i64 = 24 * 60;

pub fn is_valid_step(minutes: i64) -> bool {
    minutes > 0 && minutes <= MAX_SLOT_STEP_MINUTES
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("time slot overlaps appointment {appointment_id}")]
    Conflict { appointment_id: String },

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Half-open intervals `[s1, e1)` and `[s2, e2)` intersect. Touching is not overlap.
pub fn overlaps(
    s1: &NaiveDateTime,
    e1: &NaiveDateTime,
    s2: &NaiveDateTime,
    e2: &NaiveDateTime,
) -> bool {
    s1 < e2 && s2 < e1
}

/// First scheduled appointment intersecting `[start, end)`.
pub fn find_conflict<'a>(
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    booked: &'a [Appointment],
) -> Option<&'a Appointment> {
    booked.iter().find(|a| {
        a.status == AppointmentStatus::Scheduled
            && overlaps(start, end, &a.appointment_start, &a.appointment_end)
    })
}

/// Candidate starts on `date`, ascending and unique. Each candidate fits inside a
/// single window and clears every scheduled appointment in `booked`.
pub fn compute_slots(
    date: NaiveDate,
    hours: &WorkingHours,
    booked: &[Appointment],
    duration: Duration,
    step: Duration,
) -> Vec<NaiveDateTime> {
    if duration <= Duration::zero() || step <= Duration::zero() {
        return vec![];
    }

    let mut slots = BTreeSet::new();
    for window in hours.windows_on(date) {
        let window_end = date.and_time(window.end);
        let mut cursor = date.and_time(window.start);
        while let Some(end) = cursor.checked_add_signed(duration) {
            if end > window_end {
                break;
            }
            if find_conflict(&cursor, &end, booked).is_none() {
                slots.insert(cursor);
            }
            match cursor.checked_add_signed(step) {
                Some(next) => cursor = next,
                None => break,
            }
        }
    }
    slots.into_iter().collect()
}

/// `[midnight, next midnight)` of `date`; `None` on the last representable day.
pub fn day_bounds(date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let next = date.succ_opt()?;
    Some((date.and_time(NaiveTime::MIN), next.and_time(NaiveTime::MIN)))
}

pub fn require_doctor(conn: &Connection, doctor_id: &str) -> Result<User, SchedulingError> {
    match queries::get_user(conn, doctor_id)? {
        Some(user) if user.role == Role::Doctor => Ok(user),
        _ => Err(SchedulingError::Validation(format!(
            "doctor {doctor_id} does not exist"
        ))),
    }
}

pub fn require_bookable_service(
    conn: &Connection,
    service_id: &str,
) -> Result<Service, SchedulingError> {
    let service = queries::get_service(conn, service_id)?
        .filter(|s| s.is_active)
        .ok_or_else(|| SchedulingError::Validation(format!("service {service_id} does not exist")))?;

    if service.duration_minutes <= 0 {
        return Err(SchedulingError::Validation(format!(
            "service {service_id} has no positive duration"
        )));
    }
    Ok(service)
}

/// Free start times for a doctor and service on one day. Advisory only: booking
/// re-checks under the write lock.
pub fn available_slots(
    conn: &Connection,
    doctor_id: &str,
    service_id: &str,
    date: NaiveDate,
    step_minutes: Option<i64>,
) -> Result<(Service, Vec<NaiveDateTime>), SchedulingError> {
    require_doctor(conn, doctor_id)?;
    let service = require_bookable_service(conn, service_id)?;
    let hours = working_hours::load(conn, doctor_id)?;

    let (day_start, day_end) = day_bounds(date)
        .ok_or_else(|| SchedulingError::Validation(format!("date {date} is out of range")))?;
    let booked = queries::get_scheduled_in_range(conn, doctor_id, &day_start, &day_end)?;

    let duration = Duration::minutes(service.duration_minutes as i64);
    let step = step_minutes
        .filter(|m| is_valid_step(*m))
        .map(Duration::minutes)
        .unwrap_or(duration);
    let slots = compute_slots(date, &hours, &booked, duration, step);

    tracing::debug!(
        doctor_id,
        service_id,
        %date,
        booked = booked.len(),
        free = slots.len(),
        "computed available slots"
    );
    Ok((service, slots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Day, TimeWindow};

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    // 2025-06-16 is a Monday
    fn monday() -> NaiveDate {
        dt("2025-06-16 00:00").date()
    }

    fn booked(start: &str, minutes: i64) -> Appointment {
        let now = chrono::Utc::now().naive_utc();
        Appointment {
            id: format!("appt-{start}"),
            patient_id: "pat".to_string(),
            doctor_id: "doc".to_string(),
            service_id: "svc".to_string(),
            appointment_start: dt(start),
            appointment_end: dt(start) + Duration::minutes(minutes),
            status: AppointmentStatus::Scheduled,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_overlap_is_strict() {
        let (a, b, c) = (dt("2025-06-16 10:00"), dt("2025-06-16 10:30"), dt("2025-06-16 11:00"));
        assert!(!overlaps(&a, &b, &b, &c));
        assert!(!overlaps(&b, &c, &a, &b));
        assert!(overlaps(&a, &c, &b, &c));
        assert!(overlaps(&a, &c, &a, &b));
    }

    #[test]
    fn test_default_hours_every_duration_step() {
        let hours = WorkingHours::default_for("doc");
        let slots = compute_slots(monday(), &hours, &[], Duration::minutes(60), Duration::minutes(60));
        assert_eq!(slots.len(), 8);
        assert_eq!(slots.first(), Some(&dt("2025-06-16 09:00")));
        assert_eq!(slots.last(), Some(&dt("2025-06-16 16:00")));
    }

    #[test]
    fn test_existing_booking_excluded() {
        let hours = WorkingHours::default_for("doc");
        let slots = compute_slots(
            monday(),
            &hours,
            &[booked("2025-06-16 10:00", 30)],
            Duration::minutes(30),
            Duration::minutes(30),
        );
        assert_eq!(slots.len(), 15);
        assert!(!slots.contains(&dt("2025-06-16 10:00")));
        assert!(slots.contains(&dt("2025-06-16 09:30")));
        assert!(slots.contains(&dt("2025-06-16 10:30")));
    }

    #[test]
    fn test_finer_step_skips_partial_overlaps() {
        let hours = WorkingHours::default_for("doc");
        let slots = compute_slots(
            monday(),
            &hours,
            &[booked("2025-06-16 10:00", 30)],
            Duration::minutes(30),
            Duration::minutes(15),
        );
        assert!(slots.contains(&dt("2025-06-16 09:30")));
        assert!(!slots.contains(&dt("2025-06-16 09:45")));
        assert!(!slots.contains(&dt("2025-06-16 10:00")));
        assert!(!slots.contains(&dt("2025-06-16 10:15")));
        assert!(slots.contains(&dt("2025-06-16 10:30")));
        assert_eq!(slots.last(), Some(&dt("2025-06-16 16:30")));
    }

    #[test]
    fn test_cancelled_bookings_do_not_block() {
        let hours = WorkingHours::default_for("doc");
        let mut cancelled = booked("2025-06-16 10:00", 30);
        cancelled.status = AppointmentStatus::Cancelled;
        let slots = compute_slots(
            monday(),
            &hours,
            &[cancelled],
            Duration::minutes(30),
            Duration::minutes(30),
        );
        assert!(slots.contains(&dt("2025-06-16 10:00")));
    }

    #[test]
    fn test_slot_never_spans_window_boundary() {
        let hours = WorkingHours::configured(
            "doc",
            vec![
                TimeWindow::new(Day::Mon, t("09:00"), t("10:45")),
                TimeWindow::new(Day::Mon, t("13:00"), t("14:00")),
            ],
        );
        let slots = compute_slots(monday(), &hours, &[], Duration::minutes(30), Duration::minutes(30));
        assert_eq!(
            slots,
            vec![
                dt("2025-06-16 09:00"),
                dt("2025-06-16 09:30"),
                dt("2025-06-16 10:00"),
                dt("2025-06-16 13:00"),
                dt("2025-06-16 13:30"),
            ]
        );
        for slot in &slots {
            assert!(hours.contains(slot, &(*slot + Duration::minutes(30))));
        }
    }

    #[test]
    fn test_overlapping_windows_do_not_duplicate() {
        let hours = WorkingHours::configured(
            "doc",
            vec![
                TimeWindow::new(Day::Mon, t("09:00"), t("11:00")),
                TimeWindow::new(Day::Mon, t("10:00"), t("12:00")),
            ],
        );
        let slots = compute_slots(monday(), &hours, &[], Duration::minutes(60), Duration::minutes(60));
        assert_eq!(
            slots,
            vec![dt("2025-06-16 09:00"), dt("2025-06-16 10:00"), dt("2025-06-16 11:00")]
        );
    }

    #[test]
    fn test_no_windows_that_day() {
        let hours = WorkingHours::configured(
            "doc",
            vec![TimeWindow::new(Day::Tue, t("09:00"), t("17:00"))],
        );
        assert!(
            compute_slots(monday(), &hours, &[], Duration::minutes(30), Duration::minutes(30))
                .is_empty()
        );
    }

    #[test]
    fn test_full_day_booking_leaves_nothing() {
        let hours = WorkingHours::default_for("doc");
        let slots = compute_slots(
            monday(),
            &hours,
            &[booked("2025-06-16 09:00", 480)],
            Duration::minutes(15),
            Duration::minutes(15),
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn test_duration_longer_than_window() {
        let hours = WorkingHours::default_for("doc");
        let slots = compute_slots(monday(), &hours, &[], Duration::minutes(481), Duration::minutes(15));
        assert!(slots.is_empty());
    }

    #[test]
    fn test_non_positive_step_yields_nothing() {
        let hours = WorkingHours::default_for("doc");
        assert!(compute_slots(monday(), &hours, &[], Duration::minutes(30), Duration::zero()).is_empty());
    }

    #[test]
    fn test_find_conflict_returns_overlapping_appointment() {
        let existing = [booked("2025-06-16 10:00", 60)];
        let hit = find_conflict(&dt("2025-06-16 10:30"), &dt("2025-06-16 11:30"), &existing);
        assert_eq!(hit.map(|a| a.id.as_str()), Some("appt-2025-06-16 10:00"));
        assert!(find_conflict(&dt("2025-06-16 11:00"), &dt("2025-06-16 12:00"), &existing).is_none());
    }

    #[test]
    fn test_day_bounds() {
        let (start, end) = day_bounds(monday()).unwrap();
        assert_eq!(start, dt("2025-06-16 00:00"));
        assert_eq!(end, dt("2025-06-17 00:00"));
        assert!(day_bounds(NaiveDate::MAX).is_none());
    }

    #[test]
    fn test_slots_on_last_representable_day() {
        let hours = WorkingHours::default_for("doc");
        let slots = compute_slots(
            NaiveDate::MAX,
            &hours,
            &[],
            Duration::minutes(60),
            Duration::minutes(60),
        );
        assert_eq!(slots.len(), 8);
    }

    #[test]
    fn test_available_slots_rejects_out_of_range_date() {
        let conn = crate::db::init_db(":memory:").unwrap();
        let now = chrono::Utc::now().naive_utc();
        queries::create_user(
            &conn,
            &User {
                id: "doc".to_string(),
                email: "doc@clinic.test".to_string(),
                name: "Doc".to_string(),
                role: Role::Doctor,
                phone: None,
                specialization: None,
                password_hash: "hash".to_string(),
                created_at: now,
            },
        )
        .unwrap();
        queries::create_service(
            &conn,
            &Service {
                id: "svc".to_string(),
                name: "Checkup".to_string(),
                description: String::new(),
                duration_minutes: 30,
                price: 10.0,
                category: crate::models::ServiceCategory::Consultation,
                is_active: true,
                created_at: now,
            },
        )
        .unwrap();

        let err = available_slots(&conn, "doc", "svc", NaiveDate::MAX, None).unwrap_err();
        assert!(matches!(err, SchedulingError::Validation(_)));

        let (_, slots) = available_slots(&conn, "doc", "svc", monday(), Some(15)).unwrap();
        assert_eq!(slots.len(), 31);
        let (_, slots) = available_slots(&conn, "doc", "svc", monday(), Some(i64::MAX)).unwrap();
        assert_eq!(slots.len(), 16);
    }

    #[test]
    fn test_step_bounds() {
        assert!(is_valid_step(15));
        assert!(is_valid_step(MAX_SLOT_STEP_MINUTES));
        assert!(!is_valid_step(0));
        assert!(!is_valid_step(MAX_SLOT_STEP_MINUTES + 1));
        assert!(!is_valid_step(i64::MAX));
    }
}
