//! Daily event reminder job

use std::future::Future;
use std::sync::Arc;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};
use crate::config::settings::ReminderConfig;
use crate::database::DatabaseService;
use crate::models::EventStatus;
use crate::services::bookings::BookingService;
use crate::services::notification::NotificationDispatcher;
use crate::utils::errors::Result;
use crate::utils::logging::log_side_effect_failure;

/// Outcome of one reminder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRunSummary {
    pub events_found: usize,
    pub reminders_sent: usize,
    pub reminders_failed: usize,
}

/// Date window `[start, end)` of the events reminded about on `today`
pub fn reminder_window(today: NaiveDate, lookahead_days: u32) -> (NaiveDate, NaiveDate) {
    let start = today + Duration::days(i64::from(lookahead_days));
    (start, start + Duration::days(1))
}

/// Time left until the next `hour:00` UTC strictly after `now`
pub fn duration_until_next_run(now: DateTime<Utc>, hour: u32) -> std::time::Duration {
    let at = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut next = now.date_naive().and_time(at).and_utc();
    if next <= now {
        next += Duration::days(1);
    }
    (next - now).to_std().unwrap_or_default()
}

#[derive(Clone)]
pub struct ReminderJob {
    db: DatabaseService,
    bookings: BookingService,
    notifier: Arc<dyn NotificationDispatcher>,
    config: ReminderConfig,
}

impl ReminderJob {
    pub fn new(
        db: DatabaseService,
        bookings: BookingService,
        notifier: Arc<dyn NotificationDispatcher>,
        config: ReminderConfig,
    ) -> Self {
        Self { db, bookings, notifier, config }
    }

    /// Send one reminder per confirmed booking of the approved events in today's window.
    ///
    /// A failed send is logged and counted; it does not stop the run.
    pub async fn run_once(&self, today: NaiveDate) -> Result<ReminderRunSummary> {
        let (start, end) = reminder_window(today, self.config.lookahead_days);
        info!(window_start = %start, window_end = %end, "Running event reminder task");

        let events = self
            .db
            .events
            .find_in_date_window(start, end, EventStatus::Approved)
            .await?;
        let entries = self.bookings.list_event_reminders(start, end).await?;

        let mut summary = ReminderRunSummary {
            events_found: events.len(),
            ..Default::default()
        };

        for entry in entries {
            if entry.user.email.trim().is_empty() {
                debug!(booking_id = entry.booking_id, "Skipping reminder, user has no email");
                continue;
            }

            match self.notifier.notify_event_reminder(&entry.user, &entry.event).await {
                Ok(()) => summary.reminders_sent += 1,
                Err(e) => {
                    summary.reminders_failed += 1;
                    log_side_effect_failure("event_reminder", &e.to_string(), Some(&entry.user.email));
                }
            }
        }

        info!(
            events_found = summary.events_found,
            reminders_sent = summary.reminders_sent,
            reminders_failed = summary.reminders_failed,
            "Event reminder task completed"
        );
        Ok(summary)
    }

    /// Run daily at the configured hour until `shutdown` resolves
    pub async fn run_scheduler<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if !self.config.enabled {
            info!("Event reminders disabled");
            shutdown.await;
            return;
        }

        loop {
            let wait = duration_until_next_run(Utc::now(), self.config.run_at_hour);
            info!(seconds = wait.as_secs(), hour = self.config.run_at_hour, "Next reminder run scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.run_once(Utc::now().date_naive()).await {
                        error!(error = %e, "Event reminder task failed");
                    }
                }
                _ = &mut shutdown => {
                    info!("Reminder scheduler stopping");
                    break;
                }
            }
        }
    }
}
