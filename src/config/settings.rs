//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub email: EmailConfig,
    pub reminders: ReminderConfig,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

/// Redis configuration used for real-time update fan-out
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub channel_prefix: String,
}

/// Outgoing email configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_address: String,
}

/// Event reminder job configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    /// Hour of day (UTC) at which the daily reminder run fires
    pub run_at_hour: u32,
    /// How many days ahead of the run date the reminded events take place
    pub lookahead_days: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub realtime_updates: bool,
    pub email_notifications: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::from_file("config")
    }

    /// Load settings from a specific configuration file (extension optional)
    /// layered over the defaults and under environment variables
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("EVENTHUB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::EventHubError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/eventhub".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 30,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                channel_prefix: "eventhub:".to_string(),
            },
            email: EmailConfig {
                enabled: false,
                smtp_host: "smtp.gmail.com".to_string(),
                smtp_port: 587,
                username: String::new(),
                password: String::new(),
                from_name: "Event Management".to_string(),
                from_address: String::new(),
            },
            reminders: ReminderConfig {
                enabled: true,
                run_at_hour: 0,
                lookahead_days: 1,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
                json: false,
            },
            features: FeaturesConfig {
                realtime_updates: true,
                email_notifications: true,
            },
        }
    }
}
