//! Booking model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::models::event::Event;
use crate::models::user::UserContact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Reserved for a future approval step on bookings; never produced today
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Active bookings count toward capacity and per-user uniqueness
    pub fn is_active(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }

    /// `confirmed -> cancelled` is the only transition; a cancelled booking stays cancelled
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's booking with its event attached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithEvent {
    #[serde(flatten)]
    pub booking: Booking,
    pub event: Event,
}

/// One reminder to send: a confirmed booking, who holds it and the event it is for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderEntry {
    pub booking_id: i64,
    pub user: UserContact,
    pub event: Event,
}
