// libs/booking-cell/src/services/audit.rs
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use shared_database::supabase::SupabaseClient;

#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub actor_id: String,
    pub impersonated_by: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub metadata: Value,
}

/// Fire-and-forget audit sink. A failed audit write never fails the
/// triggering operation; it is logged and dropped.
pub struct AuditService {
    supabase: Arc<SupabaseClient>,
}

impl AuditService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub fn record(&self, record: AuditRecord, auth_token: &str) {
        let supabase = Arc::clone(&self.supabase);
        let token = auth_token.to_string();

        tokio::spawn(async move {
            let body = serde_json::to_value(&record).unwrap_or(Value::Null);
            if let Err(e) = supabase.insert_minimal("audit_log", body, Some(&token)).await {
                warn!(
                    "Audit write failed for {} {} ({}): {}",
                    record.resource_type, record.resource_id, record.action, e
                );
            }
        });
    }
}
