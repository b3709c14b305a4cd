use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{CreateAppointmentRequest, SchedulerAppointment, SchedulerError};

/// Client for the external appointment-scheduling provider.
///
/// The provider is the system of record for calendar time slots. Every call
/// here is a remote side effect that cannot be rolled back locally, so the
/// client enforces a bounded request timeout and callers must treat a timeout
/// as a hard failure without assuming the remote write did not happen.
#[derive(Debug)]
pub struct SchedulingClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SchedulingClient {
    pub fn new(config: &AppConfig) -> Result<Self, SchedulerError> {
        if !config.is_scheduler_configured() {
            return Err(SchedulerError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.scheduler_timeout_secs))
            .build()
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.scheduler_base_url.clone(),
            api_key: config.scheduler_api_key.clone(),
        })
    }

    /// Create an appointment in the provider's calendar.
    /// POST /appointments
    pub async fn create_appointment(
        &self,
        request: &CreateAppointmentRequest,
    ) -> Result<SchedulerAppointment, SchedulerError> {
        info!(
            "Creating external appointment for type {} on calendar {}",
            request.appointment_type_id, request.calendar_id
        );

        let url = format!("{}/appointments", self.base_url);
        debug!("Sending appointment creation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let appointment = self.parse_appointment(response, "creation").await?;

        info!("External appointment {} created", appointment.id);
        Ok(appointment)
    }

    /// Move an existing appointment to a new provider-authoritative datetime.
    /// PUT /appointments/{id}/reschedule
    pub async fn reschedule_appointment(
        &self,
        appointment_id: i64,
        datetime: &str,
    ) -> Result<SchedulerAppointment, SchedulerError> {
        info!("Rescheduling external appointment {}", appointment_id);

        let url = format!("{}/appointments/{}/reschedule", self.base_url, appointment_id);

        let response = self
            .client
            .put(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({ "datetime": datetime }))
            .send()
            .await?;

        self.parse_appointment(response, "reschedule").await
    }

    /// Cancel an appointment, optionally flagging it as a no-show.
    /// PUT /appointments/{id}/cancel?noShow={bool}
    pub async fn cancel_appointment(
        &self,
        appointment_id: i64,
        no_show: bool,
    ) -> Result<SchedulerAppointment, SchedulerError> {
        info!(
            "Cancelling external appointment {} (no_show: {})",
            appointment_id, no_show
        );

        let url = format!(
            "{}/appointments/{}/cancel?noShow={}",
            self.base_url, appointment_id, no_show
        );

        let response = self
            .client
            .put(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        self.parse_appointment(response, "cancellation").await
    }

    async fn parse_appointment(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> Result<SchedulerAppointment, SchedulerError> {
        let status = response.status();
        let response_text = response.text().await?;

        debug!(
            "Scheduler {} response: {} - {}",
            operation, status, response_text
        );

        if !status.is_success() {
            error!(
                "Scheduler appointment {} failed: {} - {}",
                operation, status, response_text
            );
            return Err(SchedulerError::Api {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| SchedulerError::Api {
            message: format!("Failed to parse appointment response: {}", e),
        })
    }
}
