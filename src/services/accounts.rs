use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::Connection;
use serde::Deserialize;

use crate::auth::password::{hash_password, verify_password};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Role, User};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub phone: Option<String>,
    pub specialization: Option<String>,
}

fn default_role() -> String {
    Role::Patient.as_str().to_string()
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn register(conn: &Connection, request: RegisterRequest) -> Result<User, AppError> {
    let email = request.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        tracing::warn!(email = %email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }

    let role = match Role::parse(&request.role) {
        Some(Role::Admin) => {
            tracing::warn!(email = %email, "admin self-registration refused");
            return Err(AppError::Forbidden("cannot self-register as admin".into()));
        }
        Some(role) => role,
        None => {
            return Err(AppError::Validation(format!("unknown role: {}", request.role)));
        }
    };

    if queries::get_user_by_email(conn, &email)?.is_some() {
        tracing::warn!(email = %email, "email already registered");
        return Err(AppError::Conflict {
            message: "email already registered".into(),
            appointment_id: None,
        });
    }

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        name: name.to_string(),
        role,
        phone: request.phone.filter(|p| !p.trim().is_empty()),
        specialization: request
            .specialization
            .filter(|s| role == Role::Doctor && !s.trim().is_empty()),
        password_hash: hash_password(&request.password)?,
        created_at: Utc::now().naive_utc(),
    };
    queries::create_user(conn, &user)?;

    tracing::info!(user_id = %user.id, email = %user.email, role = user.role.as_str(), "user registered");
    Ok(user)
}

/// Unknown email and wrong password are indistinguishable to the caller.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<User, AppError> {
    let email = email.trim().to_lowercase();
    let invalid = || AppError::Unauthorized("invalid credentials".into());

    let Some(user) = queries::get_user_by_email(conn, &email)? else {
        tracing::warn!(email = %email, "login unknown email");
        return Err(invalid());
    };
    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(user)
}
