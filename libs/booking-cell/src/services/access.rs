// libs/booking-cell/src/services/access.rs
use std::sync::Arc;

use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;

use crate::models::{Booking, BookingError, Membership, OrgRole, Specialist};

/// The caller's standing, used by the query assembler to pick which scoped
/// query to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScope {
    /// Platform admin: sees every booking.
    Admin,
    /// Organization owner or manager: sees the organization's bookings.
    Organization(Uuid),
    /// Specialist of record: sees own bookings.
    Specialist(Uuid),
    /// Anyone else: sees bookings they created.
    Referrer(Uuid),
}

pub struct AccessService {
    supabase: Arc<SupabaseClient>,
}

impl AccessService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Resolve the caller's scope for list queries. Precedence: admin, then
    /// org owner/manager, then specialist, then referrer.
    pub async fn resolve_scope(
        &self,
        user: &User,
        auth_token: &str,
    ) -> Result<AccessScope, BookingError> {
        if user.is_platform_admin() {
            return Ok(AccessScope::Admin);
        }

        let user_id = parse_actor_id(user)?;

        let memberships = self
            .managing_memberships(user_id, None, auth_token)
            .await?;
        if let Some(membership) = memberships.first() {
            return Ok(AccessScope::Organization(membership.organization_id));
        }

        if let Some(specialist) = self.specialist_for_user(user_id, auth_token).await? {
            return Ok(AccessScope::Specialist(specialist.id));
        }

        Ok(AccessScope::Referrer(user_id))
    }

    /// Whether the caller may view or mutate this booking.
    ///
    /// Evaluated as an ordered rule list, first match wins (not additive):
    ///   1. platform admin
    ///   2. the booking's referrer's linked account
    ///   3. the specialist of record
    ///   4. owner/manager membership over the booking's organization
    ///   5. deny
    pub async fn can_access(
        &self,
        user: &User,
        booking: &Booking,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        if user.is_platform_admin() {
            return Ok(true);
        }

        let user_id = match parse_actor_id(user) {
            Ok(id) => id,
            Err(_) => return Ok(false),
        };

        let path = format!(
            "/rest/v1/referrers?id=eq.{}&user_id=eq.{}&limit=1",
            booking.referrer_id, user_id
        );
        let referrer_rows: Vec<serde_json::Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        if !referrer_rows.is_empty() {
            return Ok(true);
        }

        let path = format!(
            "/rest/v1/specialists?id=eq.{}&user_id=eq.{}&limit=1",
            booking.specialist_id, user_id
        );
        let specialist_rows: Vec<serde_json::Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        if !specialist_rows.is_empty() {
            return Ok(true);
        }

        let memberships = self
            .managing_memberships(user_id, Some(booking.organization_id), auth_token)
            .await?;
        if !memberships.is_empty() {
            return Ok(true);
        }

        debug!(
            "Access denied for user {} on booking {}",
            user.id, booking.id
        );
        Ok(false)
    }

    pub async fn require_access(
        &self,
        user: &User,
        booking: &Booking,
        auth_token: &str,
    ) -> Result<(), BookingError> {
        if self.can_access(user, booking, auth_token).await? {
            Ok(())
        } else {
            Err(BookingError::AccessDenied)
        }
    }

    pub async fn specialist_for_user(
        &self,
        user_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Specialist>, BookingError> {
        let path = format!("/rest/v1/specialists?user_id=eq.{}&limit=1", user_id);
        let rows: Vec<Specialist> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        Ok(rows.into_iter().next())
    }

    /// The caller's membership role within an organization, if any.
    pub async fn membership_role(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<OrgRole>, BookingError> {
        let path = format!(
            "/rest/v1/memberships?user_id=eq.{}&organization_id=eq.{}&limit=1",
            user_id, organization_id
        );
        let rows: Vec<Membership> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        Ok(rows.into_iter().next().map(|m| m.role))
    }

    /// Owner/manager memberships for a user. Manager is treated identically
    /// to owner pending team-scoped rules.
    async fn managing_memberships(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Membership>, BookingError> {
        let mut path = format!(
            "/rest/v1/memberships?user_id=eq.{}&role=in.(owner,manager)",
            user_id
        );
        if let Some(org_id) = organization_id {
            path.push_str(&format!("&organization_id=eq.{}", org_id));
        }
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))
    }
}

/// The JWT subject must be a UUID to be matched against local records.
pub fn parse_actor_id(user: &User) -> Result<Uuid, BookingError> {
    Uuid::parse_str(&user.id).map_err(|_| BookingError::AccessDenied)
}
