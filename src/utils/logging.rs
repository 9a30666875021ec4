//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the EventHub application.

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::{EventHubError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer when dropped, so the caller
/// must keep it alive for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "eventhub.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(stdout_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .try_init()
        .map_err(|e| EventHubError::Config(format!("Failed to install tracing subscriber: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log event lifecycle actions
pub fn log_event_action(event_id: i64, action: &str, user_id: i64, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        user_id = user_id,
        details = details,
        "Event action performed"
    );
}

/// Log booking actions
pub fn log_booking_action(booking_id: i64, event_id: i64, action: &str, user_id: i64) {
    info!(
        booking_id = booking_id,
        event_id = event_id,
        action = action,
        user_id = user_id,
        "Booking action performed"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log a failed best-effort side effect (notification, broadcast)
pub fn log_side_effect_failure(effect: &str, error: &str, context: Option<&str>) {
    warn!(
        effect = effect,
        error = error,
        context = context,
        "Side effect failed; operation result unaffected"
    );
}
