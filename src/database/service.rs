//! Database service layer
//!
//! This module provides a high-level interface to database operations

use sqlx::{Postgres, Transaction};
use crate::database::{DatabasePool, UserRepository, EventRepository, BookingRepository};
use crate::models::{User, CreateUserRequest};
use crate::utils::errors::EventHubError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pool: DatabasePool,
    pub users: UserRepository,
    pub events: EventRepository,
    pub bookings: BookingRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Start a transaction; dropping it without commit rolls back
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, EventHubError> {
        Ok(self.pool.begin().await?)
    }

    /// Return the user registered under an email, creating it on first sight
    pub async fn initialize_user(&self, request: CreateUserRequest) -> Result<User, EventHubError> {
        if let Some(existing_user) = self.users.find_by_email(&request.email).await? {
            return Ok(existing_user);
        }

        self.users.create(request).await
    }

    /// Get system statistics
    pub async fn get_system_stats(&self) -> Result<serde_json::Value, EventHubError> {
        let users = self.users.count().await?;
        let events = self.events.count().await?;
        let active_bookings: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings WHERE status <> 'cancelled'"
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(serde_json::json!({
            "users": users,
            "events": events,
            "active_bookings": active_bookings.0
        }))
    }
}
