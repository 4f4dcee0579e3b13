//! Error types for Lead Scout.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with key {key}")]
    NotFound { entity: String, key: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Outbound message-delivery errors (SMS channel).
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to send to {phone}: {reason}")]
    SendFailed { phone: String, reason: String },

    #[error("Delivery API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// One-time-passcode errors.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    /// No unused, unexpired code matched the presented phone + code.
    #[error("invalid or expired code")]
    InvalidOrExpired,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
