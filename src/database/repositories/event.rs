//! Event repository implementation

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use chrono::{NaiveDate, Utc};
use crate::models::event::{Event, EventFilter, EventStatus, EventSummary, NewEvent, StatusFilter};
use crate::utils::errors::EventHubError;

const EVENT_COLUMNS: &str = "id, name, description, date, time, location, capacity, price, category, agenda, tags, image, created_by, status, pending_updates, rejection_reason, created_at, updated_at";

const ACTIVE_BOOKINGS_COUNT: &str = "(SELECT COUNT(*) FROM bookings b WHERE b.event_id = events.id AND b.status <> 'cancelled') AS bookings_count";

const SEARCH_DOCUMENT: &str = "to_tsvector('english', name || ' ' || description || ' ' || location)";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, event: &NewEvent, created_by: i64, status: EventStatus) -> Result<Event, EventHubError> {
        let now = Utc::now();
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (name, description, date, time, location, capacity, price, category, agenda, tags, image, created_by, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.location)
        .bind(event.capacity)
        .bind(event.price)
        .bind(&event.category)
        .bind(&event.agenda)
        .bind(&event.tags)
        .bind(&event.image)
        .bind(created_by)
        .bind(status)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, EventHubError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID with its live booking count
    pub async fn find_summary(&self, id: i64) -> Result<Option<EventSummary>, EventHubError> {
        let summary = sqlx::query_as::<_, EventSummary>(&format!(
            "SELECT {EVENT_COLUMNS}, {ACTIVE_BOOKINGS_COUNT} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Load events by ID; missing IDs are skipped
    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Event>, EventHubError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Load an event and hold its row lock until the surrounding transaction ends.
    ///
    /// Every booking decision and every read-modify-write of an event goes
    /// through this lock, which serializes them per event.
    pub async fn lock_for_update(&self, conn: &mut PgConnection, id: i64) -> Result<Option<Event>, EventHubError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(event)
    }

    /// Persist the mutable fields, status and review state of an event
    pub async fn save(&self, conn: &mut PgConnection, event: &Event) -> Result<Event, EventHubError> {
        let saved = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET name = $2,
                description = $3,
                date = $4,
                time = $5,
                location = $6,
                capacity = $7,
                price = $8,
                category = $9,
                agenda = $10,
                tags = $11,
                image = $12,
                status = $13,
                pending_updates = $14,
                rejection_reason = $15,
                updated_at = $16
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.location)
        .bind(event.capacity)
        .bind(event.price)
        .bind(&event.category)
        .bind(&event.agenda)
        .bind(&event.tags)
        .bind(&event.image)
        .bind(event.status)
        .bind(&event.pending_updates)
        .bind(&event.rejection_reason)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await?;

        saved.ok_or(EventHubError::EventNotFound { event_id: event.id })
    }

    /// Delete an event together with all of its bookings
    pub async fn delete_with_bookings(&self, conn: &mut PgConnection, id: i64) -> Result<u64, EventHubError> {
        let bookings = sqlx::query("DELETE FROM bookings WHERE event_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(bookings)
    }

    /// List events matching a filter, with live booking counts.
    ///
    /// With a search term results are ordered by relevance, otherwise newest first.
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<EventSummary>, EventHubError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EVENT_COLUMNS}, {ACTIVE_BOOKINGS_COUNT} FROM events WHERE TRUE"
        ));

        if let StatusFilter::Only(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }

        if let Some(created_by) = filter.created_by {
            query.push(" AND created_by = ").push_bind(created_by);
        }

        match search {
            Some(term) => {
                query
                    .push(format!(" AND {SEARCH_DOCUMENT} @@ plainto_tsquery('english', "))
                    .push_bind(term.to_string())
                    .push(")");
                query
                    .push(format!(" ORDER BY ts_rank({SEARCH_DOCUMENT}, plainto_tsquery('english', "))
                    .push_bind(term.to_string())
                    .push(")) DESC, created_at DESC");
            }
            None => {
                query.push(" ORDER BY created_at DESC, id DESC");
            }
        }

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            query.push(" OFFSET ").push_bind(offset);
        }

        let events = query
            .build_query_as::<EventSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Events with the given status whose date falls in `[start, end)`
    pub async fn find_in_date_window(&self, start: NaiveDate, end: NaiveDate, status: EventStatus) -> Result<Vec<Event>, EventHubError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE status = $1 AND date >= $2 AND date < $3 ORDER BY date ASC, id ASC"
        ))
        .bind(status)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Count total events
    pub async fn count(&self) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
