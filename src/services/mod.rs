//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod broadcast;
pub mod bookings;
pub mod events;
pub mod notification;
pub mod reminder;

// Re-export commonly used services
pub use auth::{AuthService, Permission};
pub use broadcast::{Broadcaster, BroadcastMessage, ChannelBroadcaster, NoopBroadcaster, RedisBroadcaster};
pub use bookings::BookingService;
pub use events::EventService;
pub use notification::{NotificationDispatcher, NotificationService, MessageTemplate};
pub use reminder::{ReminderJob, ReminderRunSummary};

use std::sync::Arc;
use crate::config::settings::Settings;
use crate::database::{health_check, DatabaseService};
use crate::utils::errors::Result;

/// Service factory for creating and wiring all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub event_service: EventService,
    pub booking_service: BookingService,
    pub reminder_job: ReminderJob,
    db: DatabaseService,
    email_enabled: bool,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with SMTP notifications and the configured broadcaster
    pub fn new(settings: &Settings, db: DatabaseService) -> Result<Self> {
        let notification_service = NotificationService::new(settings)?;
        let email_enabled = notification_service.is_enabled();
        let broadcaster = broadcast::broadcaster_from_settings(settings)?;

        let mut factory = Self::with_collaborators(settings, db, Arc::new(notification_service), broadcaster);
        factory.email_enabled = email_enabled;
        Ok(factory)
    }

    /// Wire services around caller supplied notification and broadcast collaborators
    pub fn with_collaborators(
        settings: &Settings,
        db: DatabaseService,
        notifier: Arc<dyn NotificationDispatcher>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        let auth_service = AuthService::new();
        let event_service = EventService::new(db.clone(), auth_service.clone(), broadcaster.clone());
        let booking_service = BookingService::new(db.clone(), auth_service.clone(), notifier.clone(), broadcaster);
        let reminder_job = ReminderJob::new(db.clone(), booking_service.clone(), notifier, settings.reminders.clone());

        Self {
            auth_service,
            event_service,
            booking_service,
            reminder_job,
            db,
            email_enabled: false,
        }
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = health_check(self.db.pool()).await.is_ok();

        ServiceHealthStatus {
            database_healthy,
            email_enabled: self.email_enabled,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub email_enabled: bool,
}

impl ServiceHealthStatus {
    /// Email is optional; only the database is critical
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if !self.email_enabled {
            issues.push("Email notifications disabled".to_string());
        }

        issues
    }
}
