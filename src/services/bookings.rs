//! Booking capacity service
//!
//! A booking is decided while holding the event's row lock: the active count
//! is read and the new row inserted in the same transaction, so two requests
//! racing for the last seat cannot both win. The partial unique index on
//! active bookings backs the one-booking-per-user rule at the storage layer.

use std::collections::HashMap;
use std::sync::Arc;
use chrono::NaiveDate;
use serde_json::json;
use tracing::debug;
use crate::database::DatabaseService;
use crate::models::{Booking, BookingStatus, BookingWithEvent, Caller, Event, EventStatus, ReminderEntry};
use crate::services::auth::AuthService;
use crate::services::broadcast::{spawn_broadcast, Broadcaster, TOPIC_BOOKING_UPDATED};
use crate::services::notification::NotificationDispatcher;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::{log_booking_action, log_side_effect_failure};

#[derive(Clone)]
pub struct BookingService {
    db: DatabaseService,
    auth: AuthService,
    notifier: Arc<dyn NotificationDispatcher>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl BookingService {
    pub fn new(
        db: DatabaseService,
        auth: AuthService,
        notifier: Arc<dyn NotificationDispatcher>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self { db, auth, notifier, broadcaster }
    }

    /// Book a seat for a user
    pub async fn create_booking(&self, event_id: i64, user_id: i64) -> Result<Booking> {
        let mut tx = self.db.begin().await?;

        let event = self
            .db
            .events
            .lock_for_update(&mut tx, event_id)
            .await?
            .ok_or(EventHubError::EventNotFound { event_id })?;

        if self.db.bookings.find_active(&mut *tx, event_id, user_id).await?.is_some() {
            return Err(EventHubError::Conflict("You have already booked this event".to_string()));
        }

        let active = self.db.bookings.count_active(&mut *tx, event_id).await?;
        if active >= i64::from(event.capacity) {
            debug!(event_id = event_id, active = active, capacity = event.capacity, "Booking refused, event full");
            return Err(EventHubError::CapacityExceeded { event_id, capacity: event.capacity });
        }

        let booking = self.db.bookings.insert_confirmed(&mut tx, event_id, user_id).await?;
        tx.commit().await?;

        log_booking_action(booking.id, event_id, "create", user_id);
        self.send_confirmation(user_id, event);
        spawn_broadcast(self.broadcaster.clone(), TOPIC_BOOKING_UPDATED, json!({ "eventId": event_id }));
        Ok(booking)
    }

    /// Cancel one of the caller's own bookings; the record is kept with status `cancelled`
    pub async fn cancel_booking(&self, booking_id: i64, requester: &Caller) -> Result<Booking> {
        let booking = self
            .db
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(EventHubError::BookingNotFound { booking_id })?;

        self.auth.require_booking_owner(requester, &booking)?;

        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(EventHubError::Conflict("Booking is already cancelled".to_string()));
        }

        // a concurrent cancel may have won between the read and this update
        let cancelled = self
            .db
            .bookings
            .cancel(booking_id)
            .await?
            .ok_or_else(|| EventHubError::Conflict("Booking is already cancelled".to_string()))?;

        log_booking_action(booking_id, cancelled.event_id, "cancel", requester.id);
        spawn_broadcast(
            self.broadcaster.clone(),
            TOPIC_BOOKING_UPDATED,
            json!({ "eventId": cancelled.event_id }),
        );
        Ok(cancelled)
    }

    /// A user's bookings, newest first, each with its event.
    ///
    /// Bookings whose event no longer exists are left out.
    pub async fn list_user_bookings(&self, user_id: i64) -> Result<Vec<BookingWithEvent>> {
        let bookings = self.db.bookings.list_for_user(user_id).await?;

        let mut event_ids: Vec<i64> = bookings.iter().map(|b| b.event_id).collect();
        event_ids.sort_unstable();
        event_ids.dedup();

        let events: HashMap<i64, Event> = self
            .db
            .events
            .find_by_ids(&event_ids)
            .await?
            .into_iter()
            .map(|event| (event.id, event))
            .collect();

        Ok(bookings
            .into_iter()
            .filter_map(|booking| {
                let event = events.get(&booking.event_id)?.clone();
                Some(BookingWithEvent { booking, event })
            })
            .collect())
    }

    /// Confirmed bookings, with contact details, for approved events dated in `[window_start, window_end)`
    pub async fn list_event_reminders(&self, window_start: NaiveDate, window_end: NaiveDate) -> Result<Vec<ReminderEntry>> {
        let events = self
            .db
            .events
            .find_in_date_window(window_start, window_end, EventStatus::Approved)
            .await?;

        let event_ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        let attendees = self.db.bookings.confirmed_attendees(&event_ids).await?;

        let events: HashMap<i64, Event> = events.into_iter().map(|e| (e.id, e)).collect();

        Ok(attendees
            .into_iter()
            .filter_map(|attendee| {
                let event = events.get(&attendee.event_id)?.clone();
                Some(ReminderEntry {
                    booking_id: attendee.booking_id,
                    user: attendee.user,
                    event,
                })
            })
            .collect())
    }

    fn send_confirmation(&self, user_id: i64, event: Event) {
        let notifier = self.notifier.clone();
        let users = self.db.users.clone();

        tokio::spawn(async move {
            let contact = match users.find_contact(user_id).await {
                Ok(Some(contact)) => contact,
                Ok(None) => {
                    log_side_effect_failure("booking_confirmation", "user not found", Some(&user_id.to_string()));
                    return;
                }
                Err(e) => {
                    log_side_effect_failure("booking_confirmation", &e.to_string(), Some(&user_id.to_string()));
                    return;
                }
            };

            if let Err(e) = notifier.notify_booking_confirmed(&contact, &event).await {
                log_side_effect_failure("booking_confirmation", &e.to_string(), Some(&contact.email));
            }
        });
    }
}
