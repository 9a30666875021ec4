//! Error handling for EventHub
//!
//! This module defines the main error type used throughout the application
//! and the classification the REST layer relies on to pick a status code.

use thiserror::Error;

/// Main error type for EventHub operations
#[derive(Error, Debug)]
pub enum EventHubError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Booking not found: {booking_id}")]
    BookingNotFound { booking_id: i64 },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Event {event_id} is fully booked (capacity {capacity})")]
    CapacityExceeded { event_id: i64, capacity: i32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Email delivery error: {0}")]
    Email(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

/// Coarse classification of an error for callers that translate it
/// into a transport-level response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    Conflict,
    Capacity,
    Internal,
}

impl EventHubError {
    /// Map a failed insert to `Conflict` when the driver reports a unique violation.
    pub fn from_unique_violation(error: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.is_unique_violation() {
                return EventHubError::Conflict(message.to_string());
            }
        }
        EventHubError::Database(error)
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EventHubError::InvalidInput(_) => ErrorKind::Validation,
            EventHubError::EventNotFound { .. }
            | EventHubError::BookingNotFound { .. }
            | EventHubError::UserNotFound { .. } => ErrorKind::NotFound,
            EventHubError::PermissionDenied(_) => ErrorKind::Authorization,
            EventHubError::Conflict(_) => ErrorKind::Conflict,
            EventHubError::CapacityExceeded { .. } => ErrorKind::Capacity,
            EventHubError::Database(_)
            | EventHubError::Migration(_)
            | EventHubError::Redis(_)
            | EventHubError::Email(_)
            | EventHubError::Serialization(_)
            | EventHubError::Config(_)
            | EventHubError::Io(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status code the REST layer should answer with
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Authorization => 403,
            ErrorKind::Conflict | ErrorKind::Capacity => 409,
            ErrorKind::Internal => 500,
        }
    }

    /// Expected business outcomes as opposed to server faults
    pub fn is_expected(&self) -> bool {
        self.kind() != ErrorKind::Internal
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            EventHubError::Database(_) => false,
            EventHubError::Migration(_) => false,
            EventHubError::Redis(_) => true,
            EventHubError::Email(_) => true,
            EventHubError::Io(_) => true,
            EventHubError::CapacityExceeded { .. } => true,
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::Database(_) => ErrorSeverity::Critical,
            EventHubError::Migration(_) => ErrorSeverity::Critical,
            EventHubError::Config(_) => ErrorSeverity::Critical,
            EventHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            EventHubError::InvalidInput(_)
            | EventHubError::Conflict(_)
            | EventHubError::CapacityExceeded { .. }
            | EventHubError::EventNotFound { .. }
            | EventHubError::BookingNotFound { .. }
            | EventHubError::UserNotFound { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
