//! Configuration types, built from environment variables.

use secrecy::SecretString;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP API listens on.
    pub port: u16,
    /// Path to the local libSQL database file.
    pub db_path: String,
    /// Interval between listing-match sweep runs, in seconds.
    pub sweep_interval_secs: u64,
}

impl ServerConfig {
    /// Build config from environment variables, with defaults for local dev.
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("LEAD_SCOUT_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let db_path = std::env::var("LEAD_SCOUT_DB_PATH")
            .unwrap_or_else(|_| "./data/lead-scout.db".to_string());

        let sweep_interval_secs: u64 = std::env::var("LEAD_SCOUT_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        Self {
            port,
            db_path,
            sweep_interval_secs,
        }
    }
}

/// SMS delivery configuration (Twilio Messages API).
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
    /// API base URL; overridable for tests.
    pub api_base: String,
}

impl SmsConfig {
    /// Build config from environment variables.
    /// Returns `None` if `TWILIO_ACCOUNT_SID` is not set (channel disabled;
    /// issued codes are surfaced through the log instead).
    pub fn from_env() -> Option<Self> {
        let account_sid = std::env::var("TWILIO_ACCOUNT_SID").ok()?;

        let auth_token =
            SecretString::from(std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default());

        let from_number = std::env::var("TWILIO_FROM_NUMBER").unwrap_or_default();

        let api_base = std::env::var("TWILIO_API_BASE")
            .unwrap_or_else(|_| "https://api.twilio.com".to_string());

        Some(Self {
            account_sid,
            auth_token,
            from_number,
            api_base,
        })
    }
}
