//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{EventHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    if settings.features.realtime_updates {
        validate_redis_config(&settings.redis)?;
    }
    if settings.features.email_notifications {
        validate_email_config(&settings.email)?;
    }
    validate_reminder_config(&settings.reminders)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EventHubError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(EventHubError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(EventHubError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(EventHubError::Config(
            "Redis URL is required when real-time updates are enabled".to_string()
        ));
    }

    Ok(())
}

/// Validate email configuration
fn validate_email_config(config: &super::EmailConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.smtp_host.is_empty() {
        return Err(EventHubError::Config(
            "SMTP host is required when email is enabled".to_string()
        ));
    }

    if config.from_address.is_empty() {
        return Err(EventHubError::Config(
            "Sender address is required when email is enabled".to_string()
        ));
    }

    Ok(())
}

/// Validate reminder job configuration
fn validate_reminder_config(config: &super::ReminderConfig) -> Result<()> {
    if config.run_at_hour > 23 {
        return Err(EventHubError::Config(
            format!("Reminder hour must be between 0 and 23, got {}", config.run_at_hour)
        ));
    }

    if config.lookahead_days == 0 {
        return Err(EventHubError::Config(
            "Reminder lookahead must be at least one day".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
