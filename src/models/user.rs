use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub specialization: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

/// Public projection of a doctor, used for selection lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: String,
    pub name: String,
    pub specialization: Option<String>,
}

impl From<User> for DoctorSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            specialization: user.specialization,
        }
    }
}

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }

    /// A doctor manages only their own schedule; admins manage any.
    pub fn can_manage_schedule_of(&self, doctor_id: &str) -> bool {
        self.can(Capability::ManageSchedule) && (self.role == Role::Admin || self.id == doctor_id)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.id.clone(), user.role)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

/// What a role is allowed to do, independent of which record it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    BookAppointment,
    ManageSchedule,
    ManageCatalog,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn grants(&self, capability: Capability) -> bool {
        match self {
            Role::Patient => matches!(capability, Capability::BookAppointment),
            Role::Doctor => matches!(capability, Capability::ManageSchedule),
            Role::Admin => matches!(
                capability,
                Capability::ManageSchedule | Capability::ManageCatalog
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Patient, Role::Doctor, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("nurse"), None);
    }

    #[test]
    fn test_capabilities_by_role() {
        assert!(Role::Patient.grants(Capability::BookAppointment));
        assert!(!Role::Patient.grants(Capability::ManageSchedule));
        assert!(!Role::Patient.grants(Capability::ManageCatalog));

        assert!(!Role::Doctor.grants(Capability::BookAppointment));
        assert!(Role::Doctor.grants(Capability::ManageSchedule));
        assert!(!Role::Doctor.grants(Capability::ManageCatalog));

        assert!(!Role::Admin.grants(Capability::BookAppointment));
        assert!(Role::Admin.grants(Capability::ManageSchedule));
        assert!(Role::Admin.grants(Capability::ManageCatalog));
    }

    #[test]
    fn test_schedule_management_scope() {
        assert!(Actor::new("doc-1", Role::Doctor).can_manage_schedule_of("doc-1"));
        assert!(!Actor::new("doc-1", Role::Doctor).can_manage_schedule_of("doc-2"));
        assert!(Actor::new("admin", Role::Admin).can_manage_schedule_of("doc-2"));
        assert!(!Actor::new("doc-1", Role::Patient).can_manage_schedule_of("doc-1"));
        // Identity alone is not enough without the capability.
        assert!(!Actor::new("pat-1", Role::Patient).can_manage_schedule_of("pat-1"));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: "u1".to_string(),
            email: "a@b.com".to_string(),
            name: "A".to_string(),
            role: Role::Doctor,
            phone: None,
            specialization: Some("GP".to_string()),
            password_hash: "secret-hash".to_string(),
            created_at: chrono::Utc::now().naive_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"doctor\""));
    }
}
