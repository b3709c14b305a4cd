use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub scheduler_base_url: String,
    pub scheduler_api_key: String,
    pub scheduler_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            scheduler_base_url: env::var("SCHEDULER_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULER_BASE_URL not set, using empty value");
                    String::new()
                }),
            scheduler_api_key: env::var("SCHEDULER_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("SCHEDULER_API_KEY not set, using empty value");
                    String::new()
                }),
            scheduler_timeout_secs: env::var("SCHEDULER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_scheduler_configured(&self) -> bool {
        !self.scheduler_base_url.is_empty() && !self.scheduler_api_key.is_empty()
    }
}
