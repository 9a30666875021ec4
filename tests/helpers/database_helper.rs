//! Test database helper utilities
//!
//! This module provides utilities for setting up and managing test databases.
//! A PostgreSQL container is started per test database unless
//! `TEST_DATABASE_URL` points at an existing server.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Once;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres as PostgresImage;

static INIT: Once = Once::new();

/// Test database helper that manages PostgreSQL test database setup
pub struct TestDatabase {
    pub pool: PgPool,
    pub database_url: String,
    _container: Option<ContainerAsync<PostgresImage>>,
}

impl TestDatabase {
    /// Create a new test database instance with migrations applied
    pub async fn new() -> Result<Self, sqlx::Error> {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        });

        let (database_url, container) = if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
            (url, None)
        } else {
            let container = PostgresImage::default()
                .with_db_name("test_eventhub")
                .with_user("test_user")
                .with_password("test_password")
                .start()
                .await
                .expect("Failed to start postgres container");
            let host = container.get_host().await.expect("Failed to get host");
            let port = container.get_host_port_ipv4(5432).await.expect("Failed to get port");

            let url = format!(
                "postgresql://test_user:test_password@{}:{}/test_eventhub",
                host, port
            );
            (url, Some(container))
        };

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(&database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let db = Self {
            pool,
            database_url,
            _container: container,
        };
        // a shared server may hold rows from an earlier run
        db.cleanup().await?;
        Ok(db)
    }

    /// Clean all test data from the database
    pub async fn cleanup(&self) -> Result<(), sqlx::Error> {
        sqlx::query("TRUNCATE bookings, events, users RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Count records in a table
    pub async fn count_records(&self, table: &str) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Count bookings of an event with the given status
    pub async fn count_bookings(&self, event_id: i64, status: &str) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings WHERE event_id = $1 AND status::text = $2"
        )
        .bind(event_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
