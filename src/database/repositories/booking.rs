//! Booking repository implementation

use sqlx::{FromRow, PgConnection, PgPool};
use sqlx::postgres::PgExecutor;
use chrono::Utc;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::user::UserContact;
use crate::utils::errors::EventHubError;

const BOOKING_COLUMNS: &str = "id, event_id, user_id, status, created_at, updated_at";

/// Confirmed booking joined with the contact details of its holder
#[derive(Debug, Clone, FromRow)]
pub struct ConfirmedAttendee {
    pub booking_id: i64,
    pub event_id: i64,
    #[sqlx(flatten)]
    pub user: UserContact,
}

#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a confirmed booking.
    ///
    /// The partial unique index on active bookings turns a duplicate into `Conflict`.
    pub async fn insert_confirmed(&self, conn: &mut PgConnection, event_id: i64, user_id: i64) -> Result<Booking, EventHubError> {
        let now = Utc::now();
        sqlx::query_as::<_, Booking>(&format!(
            r#"
            INSERT INTO bookings (event_id, user_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(BookingStatus::Confirmed)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| EventHubError::from_unique_violation(e, "You have already booked this event"))
    }

    /// Find booking by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, EventHubError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Find the active booking a user holds for an event
    pub async fn find_active<'e, E>(&self, executor: E, event_id: i64, user_id: i64) -> Result<Option<Booking>, EventHubError>
    where
        E: PgExecutor<'e>,
    {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'"
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(booking)
    }

    /// Count active bookings for an event
    pub async fn count_active<'e, E>(&self, executor: E, event_id: i64) -> Result<i64, EventHubError>
    where
        E: PgExecutor<'e>,
    {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings WHERE event_id = $1 AND status <> 'cancelled'"
        )
        .bind(event_id)
        .fetch_one(executor)
        .await?;

        Ok(count.0)
    }

    /// Mark a booking cancelled; `None` if it was already cancelled or is gone
    pub async fn cancel(&self, id: i64) -> Result<Option<Booking>, EventHubError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = $3
            WHERE id = $1 AND status <> 'cancelled'
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(BookingStatus::Cancelled)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// All bookings of a user, newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<Booking>, EventHubError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Confirmed bookings with holder contact details for a set of events
    pub async fn confirmed_attendees(&self, event_ids: &[i64]) -> Result<Vec<ConfirmedAttendee>, EventHubError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        let attendees = sqlx::query_as::<_, ConfirmedAttendee>(
            r#"
            SELECT b.id AS booking_id, b.event_id, u.id, u.name, u.email
            FROM bookings b
            INNER JOIN users u ON u.id = b.user_id
            WHERE b.event_id = ANY($1) AND b.status = 'confirmed'
            ORDER BY b.event_id ASC, b.id ASC
            "#
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(attendees)
    }
}
