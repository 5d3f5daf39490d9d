use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::TIMESTAMP_FORMAT;
use crate::models::{
    Appointment, AppointmentStatus, AppointmentView, Role, Service, ServiceCategory, TimeWindow,
    User,
};

fn fmt_ts(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .with_context(|| format!("malformed stored timestamp: {s}"))
}

// ── Users ──

const USER_COLUMNS: &str =
    "id, email, name, role, phone, specialization, password_hash, created_at";

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, name, role, phone, specialization, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.email,
            user.name,
            user.role.as_str(),
            user.phone,
            user.specialization,
            user.password_hash,
            fmt_ts(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_user_row(row)))
        .optional()?;
    row.transpose()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    let row = conn
        .query_row(&sql, params![email], |row| Ok(parse_user_row(row)))
        .optional()?;
    row.transpose()
}

pub fn list_doctors(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE role = 'doctor' ORDER BY name ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_user_row(row)))?;

    let mut doctors = vec![];
    for row in rows {
        doctors.push(row??);
    }
    Ok(doctors)
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let role_str: String = row.get(3)?;
    let created_at_str: String = row.get(7)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: Role::parse(&role_str)
            .with_context(|| format!("unknown role in users table: {role_str}"))?,
        phone: row.get(4)?,
        specialization: row.get(5)?,
        password_hash: row.get(6)?,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Services ──

const SERVICE_COLUMNS: &str =
    "id, name, description, duration_minutes, price, category, is_active, created_at";

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, description, duration_minutes, price, category, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            service.id,
            service.name,
            service.description,
            service.duration_minutes,
            service.price,
            service.category.as_str(),
            service.is_active as i32,
            fmt_ts(&service.created_at),
        ],
    )?;
    Ok(())
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, description = ?2, duration_minutes = ?3, price = ?4,
                category = ?5, is_active = ?6
         WHERE id = ?7",
        params![
            service.name,
            service.description,
            service.duration_minutes,
            service.price,
            service.category.as_str(),
            service.is_active as i32,
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let sql = format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_service_row(row)))
        .optional()?;
    row.transpose()
}

pub fn list_active_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let sql =
        format!("SELECT {SERVICE_COLUMNS} FROM services WHERE is_active = 1 ORDER BY name ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

pub fn service_name_exists(conn: &Connection, name: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM services WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    let category_str: String = row.get(5)?;
    let created_at_str: String = row.get(7)?;

    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        duration_minutes: row.get(3)?,
        price: row.get(4)?,
        category: ServiceCategory::parse(&category_str)
            .with_context(|| format!("unknown service category: {category_str}"))?,
        is_active: row.get::<_, i32>(6)? != 0,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Working Hours ──

pub fn get_working_hours(
    conn: &Connection,
    doctor_id: &str,
) -> anyhow::Result<Option<Vec<TimeWindow>>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT windows FROM working_hours WHERE doctor_id = ?1",
            params![doctor_id],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(json) => {
            let windows = serde_json::from_str(&json)
                .with_context(|| format!("malformed working hours for doctor {doctor_id}"))?;
            Ok(Some(windows))
        }
        None => Ok(None),
    }
}

pub fn save_working_hours(
    conn: &Connection,
    doctor_id: &str,
    windows: &[TimeWindow],
) -> anyhow::Result<()> {
    let json = serde_json::to_string(windows)?;
    let now = fmt_ts(&chrono::Utc::now().naive_utc());
    conn.execute(
        "INSERT INTO working_hours (doctor_id, windows, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(doctor_id) DO UPDATE SET
           windows = excluded.windows,
           updated_at = excluded.updated_at",
        params![doctor_id, json, now],
    )?;
    Ok(())
}

// ── Appointments ──

const APPOINTMENT_COLUMNS: &str = "a.id, a.patient_id, a.doctor_id, a.service_id, a.appointment_start, \
     a.appointment_end, a.status, a.notes, a.created_at, a.updated_at";

pub fn create_appointment(conn: &Connection, appointment: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, doctor_id, service_id, appointment_start, appointment_end, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            appointment.id,
            appointment.patient_id,
            appointment.doctor_id,
            appointment.service_id,
            fmt_ts(&appointment.appointment_start),
            fmt_ts(&appointment.appointment_end),
            appointment.status.as_str(),
            appointment.notes,
            fmt_ts(&appointment.created_at),
            fmt_ts(&appointment.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1");
    let row = conn
        .query_row(&sql, params![id], |row| Ok(parse_appointment_row(row)))
        .optional()?;
    row.transpose()
}

/// Scheduled appointments of a doctor intersecting `[start, end)`, earliest first.
pub fn get_scheduled_in_range(
    conn: &Connection,
    doctor_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
         WHERE a.doctor_id = ?1 AND a.status = 'scheduled'
           AND a.appointment_start < ?3 AND a.appointment_end > ?2
         ORDER BY a.appointment_start ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![doctor_id, fmt_ts(start), fmt_ts(end)], |row| {
        Ok(parse_appointment_row(row))
    })?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// Moves an appointment from `from` to `to`; false when it was not in `from`.
pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> anyhow::Result<bool> {
    let now = fmt_ts(&chrono::Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), now, id, from.as_str()],
    )?;
    Ok(count > 0)
}

#[derive(Debug, Clone, Copy)]
pub enum AppointmentScope<'a> {
    Patient(&'a str),
    Doctor(&'a str),
    All,
}

pub fn list_appointment_views(
    conn: &Connection,
    scope: AppointmentScope<'_>,
) -> anyhow::Result<Vec<AppointmentView>> {
    let (filter, owner) = match scope {
        AppointmentScope::Patient(id) => ("WHERE a.patient_id = ?1", Some(id)),
        AppointmentScope::Doctor(id) => ("WHERE a.doctor_id = ?1", Some(id)),
        AppointmentScope::All => ("", None),
    };
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS}, p.name, d.name, s.name, s.price
         FROM appointments a
         JOIN users p ON p.id = a.patient_id
         JOIN users d ON d.id = a.doctor_id
         JOIN services s ON s.id = a.service_id
         {filter}
         ORDER BY a.appointment_start ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row| -> rusqlite::Result<anyhow::Result<AppointmentView>> {
        let appointment = match parse_appointment_row(row) {
            Ok(a) => a,
            Err(e) => return Ok(Err(e)),
        };
        Ok(Ok(AppointmentView {
            appointment,
            patient_name: row.get(10)?,
            doctor_name: row.get(11)?,
            service_name: row.get(12)?,
            service_price: row.get(13)?,
        }))
    };
    let rows = match owner {
        Some(id) => stmt.query_map(params![id], map_row)?.collect::<Vec<_>>(),
        None => stmt.query_map([], map_row)?.collect::<Vec<_>>(),
    };

    let mut views = vec![];
    for row in rows {
        views.push(row??);
    }
    Ok(views)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        service_id: row.get(3)?,
        appointment_start: parse_ts(&start_str)?,
        appointment_end: parse_ts(&end_str)?,
        status: AppointmentStatus::parse(&status_str)
            .with_context(|| format!("unknown appointment status: {status_str}"))?,
        notes: row.get(7)?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}
