use chrono::Utc;
use rusqlite::Connection;

use crate::auth::password::hash_password;
use crate::db::queries;
use crate::models::{Role, Service, ServiceCategory, User};

const DEFAULT_SERVICES: &[(&str, &str, i32, f64, ServiceCategory)] = &[
    (
        "Recipe Consultation",
        "Get medical prescriptions and recipes",
        15,
        25.00,
        ServiceCategory::Consultation,
    ),
    (
        "Sick Note",
        "Medical certificate for sick leave",
        10,
        15.00,
        ServiceCategory::Documentation,
    ),
    (
        "Vaccination",
        "Various vaccination services",
        20,
        35.00,
        ServiceCategory::Treatment,
    ),
    (
        "Wound Dressing",
        "Professional wound care and dressing",
        30,
        40.00,
        ServiceCategory::Treatment,
    ),
];

/// Creates the admin account and the default catalog. Existing rows are left alone.
pub fn seed_defaults(conn: &Connection, admin_email: &str, admin_password: &str) -> anyhow::Result<()> {
    let admin_email = admin_email.trim().to_lowercase();
    if queries::get_user_by_email(conn, &admin_email)?.is_none() {
        queries::create_user(
            conn,
            &User {
                id: uuid::Uuid::new_v4().to_string(),
                email: admin_email.clone(),
                name: "System Admin".to_string(),
                role: Role::Admin,
                phone: None,
                specialization: None,
                password_hash: hash_password(admin_password)?,
                created_at: Utc::now().naive_utc(),
            },
        )?;
        tracing::info!(email = %admin_email, "seeded admin user");
    }

    let mut added = 0;
    for (name, description, duration_minutes, price, category) in DEFAULT_SERVICES {
        if queries::service_name_exists(conn, name)? {
            continue;
        }
        queries::create_service(
            conn,
            &Service {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                description: description.to_string(),
                duration_minutes: *duration_minutes,
                price: *price,
                category: *category,
                is_active: true,
                created_at: Utc::now().naive_utc(),
            },
        )?;
        added += 1;
    }
    if added > 0 {
        tracing::info!(count = added, "seeded default services");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_seed_is_idempotent() {
        let conn = db::init_db(":memory:").unwrap();
        seed_defaults(&conn, "admin@medical.com", "admin123").unwrap();
        seed_defaults(&conn, "admin@medical.com", "admin123").unwrap();

        let services = queries::list_active_services(&conn).unwrap();
        let names: Vec<_> = services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Recipe Consultation", "Sick Note", "Vaccination", "Wound Dressing"]
        );

        let admin = queries::get_user_by_email(&conn, "admin@medical.com")
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
