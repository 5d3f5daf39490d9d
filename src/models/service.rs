use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub category: ServiceCategory,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Consultation,
    Treatment,
    Documentation,
    Emergency,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Consultation => "consultation",
            ServiceCategory::Treatment => "treatment",
            ServiceCategory::Documentation => "documentation",
            ServiceCategory::Emergency => "emergency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "consultation" => Some(ServiceCategory::Consultation),
            "treatment" => Some(ServiceCategory::Treatment),
            "documentation" => Some(ServiceCategory::Documentation),
            "emergency" => Some(ServiceCategory::Emergency),
            _ => None,
        }
    }
}

/// Fields an admin supplies when creating or editing a service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub category: String,
    pub is_active: Option<bool>,
}
