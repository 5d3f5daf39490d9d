pub mod accounts;
pub mod booking;
pub mod catalog;
pub mod scheduling;
pub mod working_hours;
