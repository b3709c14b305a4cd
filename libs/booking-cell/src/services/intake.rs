// libs/booking-cell/src/services/intake.rs
use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{BookingError, ExamineeAttribute, FieldMapping, SubmittedField};

/// Attributes that must be present for a complete examinee record. Missing
/// values do not block extraction; the orchestrator decides the policy.
pub const REQUIRED_ATTRIBUTES: &[ExamineeAttribute] = &[
    ExamineeAttribute::FirstName,
    ExamineeAttribute::LastName,
    ExamineeAttribute::Email,
];

/// Partial examinee record resolved from submitted intake fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExamineeAttributes {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub authorized_contact: Option<bool>,
    pub condition: Option<String>,
    pub case_type: Option<String>,
}

impl ExamineeAttributes {
    fn set(&mut self, attribute: ExamineeAttribute, value: &str) {
        let value = value.to_string();
        match attribute {
            ExamineeAttribute::FirstName => self.first_name = Some(value),
            ExamineeAttribute::LastName => self.last_name = Some(value),
            ExamineeAttribute::Email => self.email = Some(value),
            ExamineeAttribute::Phone => self.phone = Some(value),
            ExamineeAttribute::DateOfBirth => self.date_of_birth = Some(value),
            ExamineeAttribute::Address => self.address = Some(value),
            ExamineeAttribute::AuthorizedContact => {
                self.authorized_contact =
                    Some(matches!(value.to_lowercase().as_str(), "yes" | "true" | "1"))
            }
            ExamineeAttribute::Condition => self.condition = Some(value),
            ExamineeAttribute::CaseType => self.case_type = Some(value),
        }
    }

    fn has(&self, attribute: ExamineeAttribute) -> bool {
        match attribute {
            ExamineeAttribute::FirstName => self.first_name.is_some(),
            ExamineeAttribute::LastName => self.last_name.is_some(),
            ExamineeAttribute::Email => self.email.is_some(),
            ExamineeAttribute::Phone => self.phone.is_some(),
            ExamineeAttribute::DateOfBirth => self.date_of_birth.is_some(),
            ExamineeAttribute::Address => self.address.is_some(),
            ExamineeAttribute::AuthorizedContact => self.authorized_contact.is_some(),
            ExamineeAttribute::Condition => self.condition.is_some(),
            ExamineeAttribute::CaseType => self.case_type.is_some(),
        }
    }
}

/// Extraction outcome: the resolved attributes plus which required attributes
/// were not supplied. Distinguishing the two lets the caller choose between
/// rejecting and placeholdering instead of silently defaulting.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub attributes: ExamineeAttributes,
    pub missing_required: Vec<ExamineeAttribute>,
}

/// Resolve submitted dynamic-intake fields into examinee attributes using the
/// per-appointment-type mapping table. Unmapped fields and empty values are
/// dropped.
pub fn extract(mappings: &[FieldMapping], fields: &[SubmittedField]) -> ExtractionResult {
    let mut attributes = ExamineeAttributes::default();

    for field in fields {
        let value = field.value.trim();
        if value.is_empty() {
            continue;
        }
        if let Some(mapping) = mappings
            .iter()
            .find(|m| m.active && m.external_field_id == field.id)
        {
            attributes.set(mapping.attribute, value);
        }
    }

    let missing_required = REQUIRED_ATTRIBUTES
        .iter()
        .copied()
        .filter(|attr| !attributes.has(*attr))
        .collect();

    ExtractionResult {
        attributes,
        missing_required,
    }
}

pub struct IntakeMappingService {
    supabase: Arc<SupabaseClient>,
}

impl IntakeMappingService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Load the active field mapping table for an appointment type.
    pub async fn load_mappings(
        &self,
        appointment_type_id: i64,
        auth_token: &str,
    ) -> Result<Vec<FieldMapping>, BookingError> {
        debug!(
            "Loading intake field mappings for appointment type {}",
            appointment_type_id
        );

        let path = format!(
            "/rest/v1/intake_field_mappings?external_appointment_type_id=eq.{}&active=eq.true",
            appointment_type_id
        );
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))
    }
}
