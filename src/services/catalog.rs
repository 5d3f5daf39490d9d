use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries;
use crate::models::{Actor, Capability, Service, ServiceCategory, ServiceInput};
use crate::services::scheduling::SchedulingError;

pub fn list_services(conn: &Connection) -> Result<Vec<Service>, SchedulingError> {
    Ok(queries::list_active_services(conn)?)
}

pub fn create_service(
    conn: &Connection,
    actor: &Actor,
    input: ServiceInput,
) -> Result<Service, SchedulingError> {
    require_catalog_admin(actor)?;
    let (name, category) = validate(&input)?;

    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        description: input.description.trim().to_string(),
        duration_minutes: input.duration_minutes,
        price: input.price,
        category,
        is_active: input.is_active.unwrap_or(true),
        created_at: Utc::now().naive_utc(),
    };
    queries::create_service(conn, &service)?;

    tracing::info!(service_id = %service.id, name = %service.name, "service created");
    Ok(service)
}

pub fn update_service(
    conn: &Connection,
    actor: &Actor,
    service_id: &str,
    input: ServiceInput,
) -> Result<Service, SchedulingError> {
    require_catalog_admin(actor)?;
    let (name, category) = validate(&input)?;

    let existing = queries::get_service(conn, service_id)?
        .ok_or_else(|| SchedulingError::NotFound(format!("service {service_id}")))?;

    let service = Service {
        name,
        description: input.description.trim().to_string(),
        duration_minutes: input.duration_minutes,
        price: input.price,
        category,
        is_active: input.is_active.unwrap_or(existing.is_active),
        ..existing
    };
    if !queries::update_service(conn, &service)? {
        return Err(SchedulingError::NotFound(format!("service {service_id}")));
    }

    tracing::info!(service_id, active = service.is_active, "service updated");
    Ok(service)
}

fn require_catalog_admin(actor: &Actor) -> Result<(), SchedulingError> {
    if actor.can(Capability::ManageCatalog) {
        Ok(())
    } else {
        tracing::warn!(actor_id = %actor.id, "catalog change refused");
        Err(SchedulingError::Authorization(
            "only admins can manage services".into(),
        ))
    }
}

fn validate(input: &ServiceInput) -> Result<(String, ServiceCategory), SchedulingError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(SchedulingError::Validation("service name is required".into()));
    }
    if input.duration_minutes <= 0 {
        return Err(SchedulingError::Validation(
            "duration_minutes must be positive".into(),
        ));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(SchedulingError::Validation(
            "price must be a non-negative number".into(),
        ));
    }
    let category = ServiceCategory::parse(&input.category).ok_or_else(|| {
        SchedulingError::Validation(format!("unknown service category: {}", input.category))
    })?;
    Ok((name.to_string(), category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::Role;

    fn admin() -> Actor {
        Actor::new("root", Role::Admin)
    }

    fn input(name: &str, minutes: i32, price: f64, category: &str) -> ServiceInput {
        ServiceInput {
            name: name.to_string(),
            description: "  desc  ".to_string(),
            duration_minutes: minutes,
            price,
            category: category.to_string(),
            is_active: None,
        }
    }

    #[test]
    fn test_admin_creates_and_lists() {
        let conn = db::init_db(":memory:").unwrap();
        let created =
            create_service(&conn, &admin(), input(" Vaccination ", 20, 35.0, "treatment")).unwrap();
        assert_eq!(created.name, "Vaccination");
        assert_eq!(created.description, "desc");
        assert!(created.is_active);

        let listed = list_services(&conn).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].category, ServiceCategory::Treatment);
    }

    #[test]
    fn test_non_admins_refused() {
        let conn = db::init_db(":memory:").unwrap();
        for role in [Role::Patient, Role::Doctor] {
            let err = create_service(
                &conn,
                &Actor::new("x", role),
                input("Sick Note", 10, 15.0, "documentation"),
            )
            .unwrap_err();
            assert!(matches!(err, SchedulingError::Authorization(_)));
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let conn = db::init_db(":memory:").unwrap();
        let bad = [
            input("  ", 10, 1.0, "treatment"),
            input("Zero", 0, 1.0, "treatment"),
            input("Negative", 10, -1.0, "treatment"),
            input("NaN", 10, f64::NAN, "treatment"),
            input("Surgery", 10, 1.0, "surgery"),
        ];
        for case in bad {
            assert!(matches!(
                create_service(&conn, &admin(), case).unwrap_err(),
                SchedulingError::Validation(_)
            ));
        }
    }

    #[test]
    fn test_deactivate_hides_from_list() {
        let conn = db::init_db(":memory:").unwrap();
        let created =
            create_service(&conn, &admin(), input("Wound Dressing", 30, 40.0, "treatment")).unwrap();

        let mut change = input("Wound Dressing", 45, 50.0, "treatment");
        change.is_active = Some(false);
        let updated = update_service(&conn, &admin(), &created.id, change).unwrap();
        assert_eq!(updated.duration_minutes, 45);
        assert!(!updated.is_active);
        assert_eq!(updated.id, created.id);

        assert!(list_services(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_update_unknown_service() {
        let conn = db::init_db(":memory:").unwrap();
        let err = update_service(&conn, &admin(), "ghost", input("X", 10, 1.0, "treatment"))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound(_)));
    }
}
