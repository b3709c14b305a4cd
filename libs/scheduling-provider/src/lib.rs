pub mod client;
pub mod models;

pub use client::SchedulingClient;
pub use models::{CreateAppointmentRequest, SchedulerAppointment, SchedulerError, SchedulerField};
