pub mod appointment;
pub mod service;
pub mod user;
pub mod working_hours;

pub use appointment::{parse_timestamp, Appointment, AppointmentStatus, AppointmentView};
pub use service::{Service, ServiceCategory, ServiceInput};
pub use user::{Actor, Capability, DoctorSummary, Role, User};
pub use working_hours::{Day, TimeWindow, WorkingHours};
