use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw intake field forwarded to the provider untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerField {
    pub id: i64,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAppointmentRequest {
    /// Provider-authoritative ISO date-time string, passed through verbatim.
    pub datetime: String,
    #[serde(rename = "appointmentTypeID")]
    pub appointment_type_id: i64,
    #[serde(rename = "calendarID")]
    pub calendar_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub timezone: String,
    pub fields: Vec<SchedulerField>,
}

/// The provider's appointment record. The integer `id` is the only part the
/// portal depends on; it is persisted on the booking row.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerAppointment {
    pub id: i64,
    pub datetime: Option<String>,
    #[serde(rename = "appointmentTypeID", default)]
    pub appointment_type_id: Option<i64>,
    #[serde(rename = "calendarID", default)]
    pub calendar_id: Option<i64>,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduling provider is not configured")]
    NotConfigured,

    #[error("Scheduler API error: {message}")]
    Api { message: String },

    #[error("Scheduler request timed out")]
    Timeout,

    #[error("Scheduler transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for SchedulerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SchedulerError::Timeout
        } else {
            SchedulerError::Transport(err.to_string())
        }
    }
}
