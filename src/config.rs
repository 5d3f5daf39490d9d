use std::env;

use crate::services::scheduling::is_valid_step;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_minutes: i64,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Distance between candidate slot starts; `None` steps by the service duration.
    pub slot_step_minutes: Option<i64>,
    pub admin_email: String,
    pub admin_password: String,
    pub seed_defaults: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "clinicbook.db".to_string()),
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "change-me-in-production".to_string()),
                issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "clinicbook".to_string()),
                ttl_minutes: env::var("JWT_TTL_MINUTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            },
            slot_step_minutes: parse_slot_step(env::var("SLOT_STEP_MINUTES").ok().as_deref()),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@medical.com".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
            seed_defaults: env::var("SEED_DEFAULTS")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

/// Unset, unparseable or out of range (over one day) falls back to the service duration.
fn parse_slot_step(raw: Option<&str>) -> Option<i64> {
    match raw.map(|v| v.trim().parse::<i64>()) {
        Some(Ok(m)) if is_valid_step(m) => Some(m),
        Some(_) => {
            tracing::warn!(value = ?raw, "ignoring invalid SLOT_STEP_MINUTES");
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_step_bounds() {
        assert_eq!(parse_slot_step(None), None);
        assert_eq!(parse_slot_step(Some("15")), Some(15));
        assert_eq!(parse_slot_step(Some("1440")), Some(1440));
        assert_eq!(parse_slot_step(Some("1441")), None);
        assert_eq!(parse_slot_step(Some("0")), None);
        assert_eq!(parse_slot_step(Some("-5")), None);
        assert_eq!(parse_slot_step(Some("9223372036854775807")), None);
        assert_eq!(parse_slot_step(Some("quarter")), None);
    }
}
