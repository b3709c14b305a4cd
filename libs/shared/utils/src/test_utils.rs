use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub scheduler_base_url: String,
    pub scheduler_api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            scheduler_base_url: "http://localhost:54322".to_string(),
            scheduler_api_key: "test-scheduler-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            scheduler_base_url: self.scheduler_base_url.clone(),
            scheduler_api_key: self.scheduler_api_key.clone(),
            scheduler_timeout_secs: 5,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "user".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    /// Platform administrator (JWT role claim). Organization-level roles are
    /// membership rows, not token claims.
    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn user(email: &str) -> Self {
        Self::new(email, "user")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST row payloads matching the portal's table shapes.
pub struct MockPortalResponses;

impl MockPortalResponses {
    pub fn specialist_response(id: &str, user_id: Option<&str>, active: bool) -> serde_json::Value {
        json!({
            "id": id,
            "organization_id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "first_name": "Alex",
            "last_name": "Reyes",
            "external_calendar_id": 9001,
            "active": active,
            "position": 1,
            "location": "12 Harley Street, London"
        })
    }

    pub fn membership_response(user_id: &str, organization_id: &str, role: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "organization_id": organization_id,
            "role": role,
            "team_id": null
        })
    }

    pub fn referrer_response(id: &str, organization_id: &str, user_id: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "user_id": user_id,
            "name": "Pat Referrer",
            "email": "referrer@example.com",
            "phone": "+44 20 7946 0000",
            "job_title": "Case Manager",
            "created_at": "2026-01-10T09:00:00Z"
        })
    }

    pub fn examinee_response(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "first_name": "Jordan",
            "last_name": "Smith",
            "date_of_birth": "1980-04-02",
            "address": "1 High Street, Leeds",
            "email": "jordan.smith@example.com",
            "phone": "+44 7700 900000",
            "authorized_contact": true,
            "condition": "Lower back injury",
            "case_type": "Personal injury",
            "created_at": "2026-01-10T09:00:00Z"
        })
    }

    pub fn booking_response(
        id: &str,
        organization_id: &str,
        specialist_id: &str,
        referrer_id: &str,
        examinee_id: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "organization_id": organization_id,
            "team_id": null,
            "created_by": Uuid::new_v4().to_string(),
            "referrer_id": referrer_id,
            "specialist_id": specialist_id,
            "examinee_id": examinee_id,
            "status": "active",
            "modality": "in_person",
            "duration_minutes": 60,
            "location": "12 Harley Street, London",
            "scheduled_at": "2026-09-14T10:00:00Z",
            "external_appointment_id": 55001,
            "external_appointment_type_id": 77,
            "external_calendar_id": 9001,
            "completed_at": null,
            "cancelled_at": null,
            "created_at": "2026-08-20T12:00:00Z",
            "updated_at": "2026-08-20T12:00:00Z"
        })
    }

    pub fn progress_entry_response(
        booking_id: &str,
        from_progress: Option<&str>,
        to_progress: &str,
        created_at: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "booking_id": booking_id,
            "from_progress": from_progress,
            "to_progress": to_progress,
            "changed_by": Uuid::new_v4().to_string(),
            "note": null,
            "impersonated_by": null,
            "created_at": created_at
        })
    }

    pub fn field_mapping_response(
        appointment_type_id: i64,
        external_field_id: i64,
        attribute: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "external_appointment_type_id": appointment_type_id,
            "external_field_id": external_field_id,
            "attribute": attribute,
            "active": true
        })
    }

    pub fn scheduler_appointment_response(id: i64, datetime: &str) -> serde_json::Value {
        json!({
            "id": id,
            "datetime": datetime,
            "appointmentTypeID": 77,
            "calendarID": 9001
        })
    }
}
