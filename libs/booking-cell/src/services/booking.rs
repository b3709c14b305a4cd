// libs/booking-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use scheduling_provider::{CreateAppointmentRequest, SchedulerField, SchedulingClient};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    Booking, BookingError, BookingProgress, BookingView, CancelBookingRequest,
    CreateBookingRequest, Modality, RescheduleBookingRequest, Specialist,
    SpecialistAppointmentType,
};
use crate::services::access::{parse_actor_id, AccessService};
use crate::services::audit::{AuditRecord, AuditService};
use crate::services::intake::{extract, IntakeMappingService};
use crate::services::progress::{
    allowed_successors, current_progress, fetch_booking, impersonator_of, ProgressService,
};

/// Location placeholder for telehealth bookings until the meeting link is
/// issued.
pub const TELEHEALTH_LOCATION: &str = "Telehealth meeting link to follow";
/// Sentinel used when an in-person specialist has no configured address.
pub const AWAITING_ADMIN_LOCATION: &str = "Location to be confirmed by admin";

pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    scheduler: SchedulingClient,
    access: AccessService,
    intake: IntakeMappingService,
    progress: ProgressService,
    audit: AuditService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Result<Self, BookingError> {
        let supabase = Arc::new(SupabaseClient::new(config));
        let scheduler = SchedulingClient::new(config)
            .map_err(|e| BookingError::ExternalService(e.to_string()))?;

        Ok(Self {
            scheduler,
            access: AccessService::new(Arc::clone(&supabase)),
            intake: IntakeMappingService::new(Arc::clone(&supabase)),
            progress: ProgressService::with_client(Arc::clone(&supabase)),
            audit: AuditService::new(Arc::clone(&supabase)),
            supabase,
        })
    }

    /// Create a booking: validate the specialist/appointment-type pairing,
    /// resolve examinee attributes, create the external appointment, then
    /// perform one atomic local write for referrer + examinee + booking.
    ///
    /// The external create is not transactional with the local write. If the
    /// local write fails afterwards, the external appointment is orphaned: it
    /// is logged loudly for manual reconciliation and the failure is
    /// re-raised, never swallowed.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<BookingView, BookingError> {
        info!(
            "Creating booking for specialist {} (appointment type {})",
            request.specialist_id, request.appointment_type_id
        );

        let created_by = parse_actor_id(user)?;

        // Step 1: specialist must exist and be active.
        let specialist = self
            .fetch_specialist(request.specialist_id, auth_token)
            .await?;

        // Step 2: the specialist must offer this appointment type.
        let association = self
            .fetch_association(request.specialist_id, request.appointment_type_id, auth_token)
            .await?;

        // Step 3: resolve examinee attributes from submitted intake fields.
        let mappings = self
            .intake
            .load_mappings(request.appointment_type_id, auth_token)
            .await?;
        let extraction = extract(&mappings, &request.fields);
        if !extraction.missing_required.is_empty() {
            // Soft-fail policy: proceed with empty-string placeholders.
            warn!(
                "Booking intake for specialist {} missing required examinee attributes {:?}; continuing with placeholders",
                request.specialist_id, extraction.missing_required
            );
        }
        let attributes = extraction.attributes;

        let scheduled_at = parse_provider_datetime(&request.datetime)?;
        let location = location_for(&association, &specialist);

        // Step 4: external side effect. From here on the appointment exists
        // remotely regardless of what happens locally.
        let appointment = self
            .scheduler
            .create_appointment(&CreateAppointmentRequest {
                datetime: request.datetime.clone(),
                appointment_type_id: request.appointment_type_id,
                calendar_id: specialist.external_calendar_id,
                first_name: attributes.first_name.clone().unwrap_or_default(),
                last_name: attributes.last_name.clone().unwrap_or_default(),
                email: attributes.email.clone().unwrap_or_default(),
                phone: attributes.phone.clone(),
                timezone: request.timezone.clone(),
                fields: request
                    .fields
                    .iter()
                    .map(|f| SchedulerField {
                        id: f.id,
                        value: f.value.clone(),
                    })
                    .collect(),
            })
            .await
            .map_err(|e| BookingError::ExternalService(e.to_string()))?;

        // Step 5: one atomic local write for referrer, examinee and booking.
        let params = json!({
            "p_organization_id": request.organization_id,
            "p_team_id": request.team_id,
            "p_created_by": created_by,
            "p_specialist_id": request.specialist_id,
            "p_referrer": {
                "name": request.referrer.name,
                "email": request.referrer.email,
                "phone": request.referrer.phone,
                "job_title": request.referrer.job_title,
            },
            "p_examinee": {
                "first_name": attributes.first_name.unwrap_or_default(),
                "last_name": attributes.last_name.unwrap_or_default(),
                "email": attributes.email.unwrap_or_default(),
                "phone": attributes.phone,
                "date_of_birth": attributes.date_of_birth,
                "address": attributes.address,
                "authorized_contact": attributes.authorized_contact.unwrap_or(false),
                "condition": attributes.condition,
                "case_type": attributes.case_type,
            },
            "p_booking": {
                "modality": association.modality,
                "duration_minutes": request.duration_minutes,
                "location": location,
                "scheduled_at": scheduled_at,
                "external_appointment_id": appointment.id,
                "external_appointment_type_id": request.appointment_type_id,
                "external_calendar_id": specialist.external_calendar_id,
            },
        });

        let booking: Booking = match self.supabase.rpc("create_booking", params, Some(auth_token)).await {
            Ok(booking) => booking,
            Err(e) => {
                // No automatic compensation: the orphaned external id must be
                // visible to operators for manual reconciliation.
                error!(
                    "Local booking write failed after external appointment {} was created; manual reconciliation required: {}",
                    appointment.id, e
                );
                return Err(BookingError::InconsistentState {
                    appointment_id: appointment.id,
                    message: e.to_string(),
                });
            }
        };

        self.audit.record(
            AuditRecord {
                actor_id: user.id.clone(),
                impersonated_by: impersonator_of(user).map(|id| id.to_string()),
                action: "booking.create".to_string(),
                resource_type: "booking".to_string(),
                resource_id: booking.id.to_string(),
                metadata: json!({ "external_appointment_id": appointment.id }),
            },
            auth_token,
        );

        info!(
            "Booking {} created (external appointment {})",
            booking.id, appointment.id
        );

        Ok(BookingView {
            booking,
            progress: BookingProgress::Scheduled,
            history: Vec::new(),
        })
    }

    /// Fetch a booking with its full progress history, access-checked.
    pub async fn get_booking(
        &self,
        booking_id: Uuid,
        user: &User,
        auth_token: &str,
    ) -> Result<BookingView, BookingError> {
        debug!("Fetching booking: {}", booking_id);

        let booking = fetch_booking(&self.supabase, booking_id, auth_token).await?;
        self.access.require_access(user, &booking, auth_token).await?;

        let history = self.progress.history(booking_id, auth_token).await?;
        let progress = current_progress(&history);

        Ok(BookingView {
            booking,
            progress,
            history,
        })
    }

    /// Move a booking to a new date-time. Access and current progress are
    /// re-validated before the external call; a local failure after a
    /// successful external reschedule follows the same orphan posture as
    /// creation.
    pub async fn reschedule_booking(
        &self,
        booking_id: Uuid,
        request: RescheduleBookingRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<BookingView, BookingError> {
        debug!("Rescheduling booking: {}", booking_id);

        let booking = fetch_booking(&self.supabase, booking_id, auth_token).await?;
        self.access.require_access(user, &booking, auth_token).await?;
        self.progress
            .guard_specialist_actor(user, &booking, auth_token)
            .await?;

        let history = self.progress.history(booking_id, auth_token).await?;
        let current = current_progress(&history);

        // A booking already in rescheduled keeps that progress value; only
        // the first reschedule appends an entry (the table has no
        // rescheduled -> rescheduled edge).
        let append_entry = match current {
            BookingProgress::Rescheduled => false,
            p if allowed_successors(p).contains(&BookingProgress::Rescheduled) => true,
            p => {
                return Err(BookingError::InvalidTransition {
                    from: p,
                    to: BookingProgress::Rescheduled,
                })
            }
        };

        let scheduled_at = parse_provider_datetime(&request.datetime)?;
        let actor_id = parse_actor_id(user)?;

        self.scheduler
            .reschedule_appointment(booking.external_appointment_id, &request.datetime)
            .await
            .map_err(|e| BookingError::ExternalService(e.to_string()))?;

        let params = json!({
            "p_booking_id": booking_id,
            "p_scheduled_at": scheduled_at,
            "p_changed_by": actor_id,
            "p_append_entry": append_entry,
            "p_from_progress": current,
        });

        let updated: Booking = match self.supabase.rpc("reschedule_booking", params, Some(auth_token)).await {
            Ok(booking) => booking,
            Err(e) => {
                error!(
                    "Local update failed after external appointment {} was rescheduled; manual reconciliation required: {}",
                    booking.external_appointment_id, e
                );
                return Err(BookingError::InconsistentState {
                    appointment_id: booking.external_appointment_id,
                    message: e.to_string(),
                });
            }
        };

        self.audit.record(
            AuditRecord {
                actor_id: user.id.clone(),
                impersonated_by: impersonator_of(user).map(|id| id.to_string()),
                action: "booking.reschedule".to_string(),
                resource_type: "booking".to_string(),
                resource_id: booking_id.to_string(),
                metadata: json!({ "scheduled_at": scheduled_at }),
            },
            auth_token,
        );

        info!("Booking {} rescheduled to {}", booking_id, scheduled_at);

        let history = self.progress.history(booking_id, auth_token).await?;
        let progress = current_progress(&history);
        Ok(BookingView {
            booking: updated,
            progress,
            history,
        })
    }

    /// Cancel a booking, optionally as a no-show. Same re-validation and
    /// orphan posture as rescheduling.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        request: CancelBookingRequest,
        user: &User,
        auth_token: &str,
    ) -> Result<BookingView, BookingError> {
        debug!("Cancelling booking: {} (no_show: {})", booking_id, request.no_show);

        let booking = fetch_booking(&self.supabase, booking_id, auth_token).await?;
        self.access.require_access(user, &booking, auth_token).await?;
        self.progress
            .guard_specialist_actor(user, &booking, auth_token)
            .await?;

        let history = self.progress.history(booking_id, auth_token).await?;
        let current = current_progress(&history);

        let target = if request.no_show {
            BookingProgress::NoShow
        } else {
            BookingProgress::Cancelled
        };

        if !allowed_successors(current).contains(&target) {
            return Err(BookingError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        let actor_id = parse_actor_id(user)?;
        let impersonated_by = impersonator_of(user);

        self.scheduler
            .cancel_appointment(booking.external_appointment_id, request.no_show)
            .await
            .map_err(|e| BookingError::ExternalService(e.to_string()))?;

        let params = json!({
            "p_booking_id": booking_id,
            "p_from_progress": current,
            "p_to_progress": target,
            "p_changed_by": actor_id,
            "p_note": request.note,
            "p_impersonated_by": impersonated_by,
        });

        let updated: Booking = match self
            .supabase
            .rpc("record_booking_progress", params, Some(auth_token))
            .await
        {
            Ok(booking) => booking,
            Err(e) => {
                error!(
                    "Local update failed after external appointment {} was cancelled; manual reconciliation required: {}",
                    booking.external_appointment_id, e
                );
                return Err(BookingError::InconsistentState {
                    appointment_id: booking.external_appointment_id,
                    message: e.to_string(),
                });
            }
        };

        self.audit.record(
            AuditRecord {
                actor_id: user.id.clone(),
                impersonated_by: impersonated_by.map(|id| id.to_string()),
                action: "booking.cancel".to_string(),
                resource_type: "booking".to_string(),
                resource_id: booking_id.to_string(),
                metadata: json!({ "no_show": request.no_show, "note": request.note }),
            },
            auth_token,
        );

        info!("Booking {} cancelled (no_show: {})", booking_id, request.no_show);

        let history = self.progress.history(booking_id, auth_token).await?;
        let progress = current_progress(&history);
        Ok(BookingView {
            booking: updated,
            progress,
            history,
        })
    }

    async fn fetch_specialist(
        &self,
        specialist_id: Uuid,
        auth_token: &str,
    ) -> Result<Specialist, BookingError> {
        let path = format!("/rest/v1/specialists?id=eq.{}&limit=1", specialist_id);
        let rows: Vec<Specialist> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        match rows.into_iter().next() {
            Some(specialist) if specialist.active => Ok(specialist),
            _ => Err(BookingError::SpecialistNotFound),
        }
    }

    async fn fetch_association(
        &self,
        specialist_id: Uuid,
        appointment_type_id: i64,
        auth_token: &str,
    ) -> Result<SpecialistAppointmentType, BookingError> {
        let path = format!(
            "/rest/v1/specialist_appointment_types?specialist_id=eq.{}&external_appointment_type_id=eq.{}&enabled=eq.true&limit=1",
            specialist_id, appointment_type_id
        );
        let rows: Vec<SpecialistAppointmentType> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(BookingError::AppointmentTypeNotOffered)
    }
}

/// The provider-authoritative date-time string must still parse for the local
/// booking row.
fn parse_provider_datetime(datetime: &str) -> Result<DateTime<Utc>, BookingError> {
    DateTime::parse_from_rfc3339(datetime)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BookingError::Validation(format!("Invalid datetime '{}': {}", datetime, e)))
}

/// Computed location string: meeting-link placeholder for telehealth, the
/// specialist's formatted address for in-person, or the awaiting-admin
/// sentinel when no address is configured.
pub fn location_for(association: &SpecialistAppointmentType, specialist: &Specialist) -> String {
    match association.modality {
        Modality::Telehealth => TELEHEALTH_LOCATION.to_string(),
        Modality::InPerson => specialist
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| AWAITING_ADMIN_LOCATION.to_string()),
    }
}
