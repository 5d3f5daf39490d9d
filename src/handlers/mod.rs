pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod extract;
pub mod health;
pub mod services;
