// libs/booking-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// One scheduled examination engagement. Owned by an organization and
/// referencing exactly one specialist, one examinee and one referrer.
/// `organization_id` is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub team_id: Option<Uuid>,
    pub created_by: Uuid,
    pub referrer_id: Uuid,
    pub specialist_id: Uuid,
    pub examinee_id: Uuid,
    pub status: BookingStatus,
    pub modality: Modality,
    pub duration_minutes: i32,
    pub location: String,
    pub scheduled_at: DateTime<Utc>,
    pub external_appointment_id: i64,
    pub external_appointment_type_id: i64,
    pub external_calendar_id: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Coarse booking status. A projection of the fine-grained progress value,
/// updated in lockstep with it but stored separately on the booking row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Active,
    Closed,
    Archived,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Active => write!(f, "active"),
            BookingStatus::Closed => write!(f, "closed"),
            BookingStatus::Archived => write!(f, "archived"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    InPerson,
    Telehealth,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::InPerson => write!(f, "in_person"),
            Modality::Telehealth => write!(f, "telehealth"),
        }
    }
}

/// Fine-grained booking lifecycle status, distinct from the coarse
/// `BookingStatus`. The current value of a booking is always the
/// `to_progress` of its latest progress entry, or `Scheduled` if none exist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingProgress {
    Scheduled,
    Rescheduled,
    Cancelled,
    NoShow,
    GeneratingReport,
    ReportGenerated,
    PaymentReceived,
}

impl fmt::Display for BookingProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingProgress::Scheduled => write!(f, "scheduled"),
            BookingProgress::Rescheduled => write!(f, "rescheduled"),
            BookingProgress::Cancelled => write!(f, "cancelled"),
            BookingProgress::NoShow => write!(f, "no_show"),
            BookingProgress::GeneratingReport => write!(f, "generating_report"),
            BookingProgress::ReportGenerated => write!(f, "report_generated"),
            BookingProgress::PaymentReceived => write!(f, "payment_received"),
        }
    }
}

/// Append-only audit record of a progress transition. Entries are immutable
/// and strictly ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingProgressEntry {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub from_progress: Option<BookingProgress>,
    pub to_progress: BookingProgress,
    pub changed_by: Uuid,
    pub note: Option<String>,
    pub impersonated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The party requesting the examination. Created once per booking-creation
/// call; the primary path does not deduplicate by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referrer {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The person being examined. Always created fresh alongside its booking,
/// never shared across bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Examinee {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub authorized_contact: bool,
    pub condition: Option<String>,
    pub case_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Specialist {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub external_calendar_id: i64,
    pub active: bool,
    pub position: i32,
    pub location: Option<String>,
}

/// A specialist's enabled appointment-type association, tagged with the
/// modality the pairing is delivered in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistAppointmentType {
    pub id: Uuid,
    pub specialist_id: Uuid,
    pub external_appointment_type_id: i64,
    pub modality: Modality,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    Owner,
    Manager,
    Specialist,
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrgRole::Owner => write!(f, "owner"),
            OrgRole::Manager => write!(f, "manager"),
            OrgRole::Specialist => write!(f, "specialist"),
        }
    }
}

/// Binds a user to an organization with a role. Team membership is an
/// orthogonal, best-effort grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: OrgRole,
    pub team_id: Option<Uuid>,
}

// ==============================================================================
// INTAKE FIELD MAPPING MODELS
// ==============================================================================

/// Canonical examinee attribute an intake form field can map onto.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExamineeAttribute {
    FirstName,
    LastName,
    Email,
    Phone,
    DateOfBirth,
    Address,
    AuthorizedContact,
    Condition,
    CaseType,
}

impl fmt::Display for ExamineeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExamineeAttribute::FirstName => write!(f, "first_name"),
            ExamineeAttribute::LastName => write!(f, "last_name"),
            ExamineeAttribute::Email => write!(f, "email"),
            ExamineeAttribute::Phone => write!(f, "phone"),
            ExamineeAttribute::DateOfBirth => write!(f, "date_of_birth"),
            ExamineeAttribute::Address => write!(f, "address"),
            ExamineeAttribute::AuthorizedContact => write!(f, "authorized_contact"),
            ExamineeAttribute::Condition => write!(f, "condition"),
            ExamineeAttribute::CaseType => write!(f, "case_type"),
        }
    }
}

/// Per-appointment-type mapping from an external form-field id to a canonical
/// examinee attribute. Supplied by the form-configuration collaborator,
/// consumed read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub id: Uuid,
    pub external_appointment_type_id: i64,
    pub external_field_id: i64,
    pub attribute: ExamineeAttribute,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedField {
    pub id: i64,
    pub value: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferrerInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub organization_id: Uuid,
    pub team_id: Option<Uuid>,
    pub specialist_id: Uuid,
    pub appointment_type_id: i64,
    /// Provider-authoritative ISO date-time string, forwarded verbatim to the
    /// external scheduler.
    pub datetime: String,
    pub timezone: String,
    pub duration_minutes: i32,
    pub referrer: ReferrerInput,
    pub fields: Vec<SubmittedField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProgressRequest {
    pub progress: BookingProgress,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleBookingRequest {
    pub datetime: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBookingRequest {
    #[serde(default)]
    pub no_show: bool,
    pub note: Option<String>,
}

/// Booking read model returned to consumers: the row, its full ordered
/// progress history and the derived current progress.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub booking: Booking,
    pub progress: BookingProgress,
    pub history: Vec<BookingProgressEntry>,
}

// ==============================================================================
// LIST QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Default)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub specialist_ids: Vec<Uuid>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferrerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub organization_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamineeSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingListItem {
    #[serde(flatten)]
    pub booking: Booking,
    pub specialist: Option<SpecialistSummary>,
    pub referrer: Option<ReferrerSummary>,
    pub examinee: Option<ExamineeSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// List response: paginated by default; calendar-window queries return no
/// pagination descriptor.
#[derive(Debug, Clone, Serialize)]
pub struct BookingListResponse {
    pub items: Vec<BookingListItem>,
    pub pagination: Option<Pagination>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Booking not found")]
    NotFound,

    #[error("Specialist not found or inactive")]
    SpecialistNotFound,

    #[error("Specialist does not offer this appointment type")]
    AppointmentTypeNotOffered,

    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid progress transition: {from} -> {to}")]
    InvalidTransition {
        from: BookingProgress,
        to: BookingProgress,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External scheduler error: {0}")]
    ExternalService(String),

    #[error("Local write failed after external appointment {appointment_id} was created: {message}")]
    InconsistentState { appointment_id: i64, message: String },

    #[error("Database error: {0}")]
    Database(String),
}
