//! Event lifecycle service
//!
//! Moves events between pending, approved and rejected, and stages owner
//! edits of approved events as pending updates until an admin reviews them.
//! Read-modify-write operations hold the event row lock for their whole
//! transaction so concurrent edits cannot drop each other's staged fields.

use std::sync::Arc;
use serde_json::json;
use tracing::{debug, info};
use crate::database::DatabaseService;
use crate::models::event::plan_update;
use crate::models::{
    Caller, CreateEventRequest, Event, EventFilter, EventStatus, EventSummary, RejectionOutcome,
    StatusFilter, UpdateEventRequest,
};
use crate::services::auth::AuthService;
use crate::services::broadcast::{spawn_broadcast, Broadcaster, TOPIC_EVENT_UPDATED};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::truncate_text;
use crate::utils::logging::{log_admin_action, log_event_action};

#[derive(Clone)]
pub struct EventService {
    db: DatabaseService,
    auth: AuthService,
    broadcaster: Arc<dyn Broadcaster>,
}

impl EventService {
    pub fn new(db: DatabaseService, auth: AuthService, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { db, auth, broadcaster }
    }

    /// Create an event; admins publish straight away, everyone else waits for review
    pub async fn create_event(&self, request: CreateEventRequest, creator: &Caller) -> Result<Event> {
        let new_event = request.validate()?;

        if self.db.users.find_by_id(creator.id).await?.is_none() {
            return Err(EventHubError::UserNotFound { user_id: creator.id });
        }

        let status = EventStatus::initial_for(creator);
        let event = self.db.events.create(&new_event, creator.id, status).await?;

        log_event_action(event.id, "create", creator.id, Some(event.status.as_str()));
        self.announce(&event);
        Ok(event)
    }

    /// Apply or stage an edit depending on who asks and the event's status
    pub async fn update_event(&self, event_id: i64, request: UpdateEventRequest, requester: &Caller) -> Result<Event> {
        let patch = request.into_patch()?;

        let mut tx = self.db.begin().await?;
        let mut event = self
            .db
            .events
            .lock_for_update(&mut tx, event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        let plan = plan_update(&event, requester)?;
        let fields = patch.changed_fields().join(",");
        event.apply_update(patch, plan);

        let event = self.db.events.save(&mut tx, &event).await?;
        tx.commit().await?;

        debug!(event_id = event_id, plan = ?plan, fields = %fields, "Event update applied");
        log_event_action(event_id, "update", requester.id, Some(&fields));
        self.announce(&event);
        Ok(event)
    }

    /// Approve a new event or promote its staged updates
    pub async fn approve_event(&self, event_id: i64, requester: &Caller) -> Result<Event> {
        self.auth.require_admin(requester, "approve events")?;

        let mut tx = self.db.begin().await?;
        let mut event = self
            .db
            .events
            .lock_for_update(&mut tx, event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        let had_updates = event.has_pending_updates();
        event.approve();

        let event = self.db.events.save(&mut tx, &event).await?;
        tx.commit().await?;

        let details = if had_updates { "pending updates applied" } else { "event approved" };
        log_admin_action(requester.id, "approve_event", Some(&event_id.to_string()), Some(details));
        self.announce(&event);
        Ok(event)
    }

    /// Reject staged updates, or the event itself when nothing is staged.
    ///
    /// A rejected event is kept so its owner can edit and resubmit it.
    pub async fn reject_event(&self, event_id: i64, requester: &Caller, reason: Option<String>) -> Result<(Event, RejectionOutcome)> {
        self.auth.require_admin(requester, "reject events")?;

        let mut tx = self.db.begin().await?;
        let mut event = self
            .db
            .events
            .lock_for_update(&mut tx, event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        let outcome = event.reject(reason);

        let event = self.db.events.save(&mut tx, &event).await?;
        tx.commit().await?;

        let details = match (outcome, &event.rejection_reason) {
            (RejectionOutcome::PendingUpdatesDiscarded, Some(reason)) => format!("pending updates discarded: {}", truncate_text(reason, 80)),
            (RejectionOutcome::PendingUpdatesDiscarded, None) => "pending updates discarded".to_string(),
            (RejectionOutcome::EventRejected, Some(reason)) => format!("event rejected: {}", truncate_text(reason, 80)),
            (RejectionOutcome::EventRejected, None) => "event rejected".to_string(),
        };
        log_admin_action(requester.id, "reject_event", Some(&event_id.to_string()), Some(&details));
        self.announce(&event);
        Ok((event, outcome))
    }

    /// Delete an event and every booking for it; returns how many bookings went with it
    pub async fn delete_event(&self, event_id: i64, requester: &Caller) -> Result<u64> {
        let mut tx = self.db.begin().await?;
        let event = self
            .db
            .events
            .lock_for_update(&mut tx, event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        self.auth.require_owner_or_admin(requester, &event, "delete")?;

        let removed = self.db.events.delete_with_bookings(&mut tx, event_id).await?;
        tx.commit().await?;

        info!(event_id = event_id, bookings_removed = removed, "Event deleted");
        log_event_action(event_id, "delete", requester.id, None);
        spawn_broadcast(
            self.broadcaster.clone(),
            TOPIC_EVENT_UPDATED,
            json!({ "eventId": event_id, "status": "deleted" }),
        );
        Ok(removed)
    }

    /// List events; approved only unless the filter says otherwise
    pub async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventSummary>> {
        self.db.events.list(filter).await
    }

    /// Get an event with its live booking count
    pub async fn get_event(&self, event_id: i64) -> Result<EventSummary> {
        self.db
            .events
            .find_summary(event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })
    }

    /// Every event a user created, whatever its status
    pub async fn list_events_by_creator(&self, user_id: i64) -> Result<Vec<EventSummary>> {
        let filter = EventFilter {
            status: StatusFilter::All,
            created_by: Some(user_id),
            ..Default::default()
        };
        self.db.events.list(&filter).await
    }

    fn announce(&self, event: &Event) {
        spawn_broadcast(
            self.broadcaster.clone(),
            TOPIC_EVENT_UPDATED,
            json!({ "eventId": event.id, "status": event.status }),
        );
    }
}
