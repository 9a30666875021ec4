//! User repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::user::{User, UserContact, CreateUserRequest, Role};
use crate::utils::errors::EventHubError;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, EventHubError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, name, email, role, created_at, updated_at
            "#
        )
        .bind(request.name.trim())
        .bind(request.email.trim().to_lowercase())
        .bind(request.role.unwrap_or(Role::User))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EventHubError::from_unique_violation(e, "Email already registered"))
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, EventHubError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at, updated_at FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, EventHubError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at, updated_at FROM users WHERE email = $1"
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Contact details for notifications
    pub async fn find_contact(&self, id: i64) -> Result<Option<UserContact>, EventHubError> {
        let contact = sqlx::query_as::<_, UserContact>(
            "SELECT id, name, email FROM users WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contact)
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64, EventHubError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
