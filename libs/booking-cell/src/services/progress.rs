// libs/booking-cell/src/services/progress.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{
    Booking, BookingError, BookingProgress, BookingProgressEntry, BookingView, OrgRole,
};
use crate::services::access::{parse_actor_id, AccessService};
use crate::services::audit::{AuditRecord, AuditService};

/// Allowed successor set for each progress state. Cancelled, no-show and
/// payment-received are terminal.
pub fn allowed_successors(progress: BookingProgress) -> &'static [BookingProgress] {
    match progress {
        BookingProgress::Scheduled => &[
            BookingProgress::Rescheduled,
            BookingProgress::Cancelled,
            BookingProgress::NoShow,
            BookingProgress::GeneratingReport,
        ],
        BookingProgress::Rescheduled => &[
            BookingProgress::Cancelled,
            BookingProgress::NoShow,
            BookingProgress::GeneratingReport,
        ],
        BookingProgress::GeneratingReport => &[BookingProgress::ReportGenerated],
        BookingProgress::ReportGenerated => &[BookingProgress::PaymentReceived],
        BookingProgress::Cancelled
        | BookingProgress::NoShow
        | BookingProgress::PaymentReceived => &[],
    }
}

pub fn is_terminal(progress: BookingProgress) -> bool {
    allowed_successors(progress).is_empty()
}

/// Current progress of a booking: the `to_progress` of its latest entry, or
/// `Scheduled` if none exist.
pub fn current_progress(history: &[BookingProgressEntry]) -> BookingProgress {
    history
        .iter()
        .max_by_key(|entry| entry.created_at)
        .map(|entry| entry.to_progress)
        .unwrap_or(BookingProgress::Scheduled)
}

/// Impersonation marker carried in the token's metadata by the admin
/// impersonation flow, recorded on the entry when present.
pub fn impersonator_of(user: &User) -> Option<Uuid> {
    user.metadata
        .as_ref()
        .and_then(|m| m.get("impersonated_by"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

pub(crate) async fn fetch_booking(
    supabase: &SupabaseClient,
    booking_id: Uuid,
    auth_token: &str,
) -> Result<Booking, BookingError> {
    let path = format!("/rest/v1/bookings?id=eq.{}&limit=1", booking_id);
    let rows: Vec<Booking> = supabase
        .request(Method::GET, &path, Some(auth_token), None)
        .await
        .map_err(|e| BookingError::Database(e.to_string()))?;

    rows.into_iter().next().ok_or(BookingError::NotFound)
}

pub struct ProgressService {
    supabase: Arc<SupabaseClient>,
    access: AccessService,
    audit: AuditService,
}

impl ProgressService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            access: AccessService::new(Arc::clone(&supabase)),
            audit: AuditService::new(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// Full progress history of a booking, oldest first.
    pub async fn history(
        &self,
        booking_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<BookingProgressEntry>, BookingError> {
        let path = format!(
            "/rest/v1/booking_progress_entries?booking_id=eq.{}&order=created_at.asc",
            booking_id
        );
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))
    }

    /// Apply a guarded progress transition.
    ///
    /// The entry insert and the booking-row side effects (cancelled/no-show
    /// set `cancelled_at` and close the booking, payment-received sets
    /// `completed_at` and closes it) land in one database transaction via the
    /// `record_booking_progress` function.
    pub async fn transition(
        &self,
        booking_id: Uuid,
        new_progress: BookingProgress,
        user: &User,
        note: Option<String>,
        auth_token: &str,
    ) -> Result<BookingView, BookingError> {
        debug!(
            "Progress transition requested for booking {}: -> {}",
            booking_id, new_progress
        );

        let booking = fetch_booking(&self.supabase, booking_id, auth_token).await?;

        self.access.require_access(user, &booking, auth_token).await?;
        self.guard_specialist_actor(user, &booking, auth_token).await?;

        let history = self.history(booking_id, auth_token).await?;
        let current = current_progress(&history);

        if !allowed_successors(current).contains(&new_progress) {
            warn!(
                "Invalid progress transition attempted on booking {}: {} -> {}",
                booking_id, current, new_progress
            );
            return Err(BookingError::InvalidTransition {
                from: current,
                to: new_progress,
            });
        }

        let actor_id = parse_actor_id(user)?;
        let impersonated_by = impersonator_of(user);

        let updated: Booking = self
            .supabase
            .rpc(
                "record_booking_progress",
                json!({
                    "p_booking_id": booking_id,
                    "p_from_progress": current,
                    "p_to_progress": new_progress,
                    "p_changed_by": actor_id,
                    "p_note": note,
                    "p_impersonated_by": impersonated_by,
                }),
                Some(auth_token),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        self.audit.record(
            AuditRecord {
                actor_id: user.id.clone(),
                impersonated_by: impersonated_by.map(|id| id.to_string()),
                action: "booking.progress".to_string(),
                resource_type: "booking".to_string(),
                resource_id: booking_id.to_string(),
                metadata: json!({
                    "from": current,
                    "to": new_progress,
                    "note": note,
                }),
            },
            auth_token,
        );

        info!(
            "Booking {} progressed {} -> {}",
            booking_id, current, new_progress
        );

        let history = self.history(booking_id, auth_token).await?;
        let progress = current_progress(&history);
        Ok(BookingView {
            booking: updated,
            progress,
            history,
        })
    }

    /// Actors whose organizational role is specialist may only move their
    /// own bookings, even when another rule would grant them access. Applied
    /// to every mutation path, not just direct progress updates.
    pub(crate) async fn guard_specialist_actor(
        &self,
        user: &User,
        booking: &Booking,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        if user.is_platform_admin() {
            return Ok(());
        }

        let actor_id = parse_actor_id(user)?;
        let role = self
            .access
            .membership_role(actor_id, booking.organization_id, auth_token)
            .await?;

        if role == Some(OrgRole::Specialist) {
            let own = self.access.specialist_for_user(actor_id, auth_token).await?;
            let is_own_booking = own.map(|s| s.id == booking.specialist_id).unwrap_or(false);
            if !is_own_booking {
                return Err(BookingError::AccessDenied);
            }
        }

        Ok(())
    }
}
