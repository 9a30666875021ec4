//! Database connection management

use sqlx::{Pool, Postgres};
use tokio::sync::OnceCell;
use crate::config::DatabaseConfig;
use crate::utils::errors::EventHubError;

pub type DatabasePool = Pool<Postgres>;

/// Create a new database connection pool
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool, EventHubError> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(Some(std::time::Duration::from_secs(600)))
        .max_lifetime(Some(std::time::Duration::from_secs(1800)))
        .connect(&config.url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), EventHubError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Check database health
pub async fn health_check(pool: &DatabasePool) -> Result<(), EventHubError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await?;

    Ok(())
}

/// Explicitly owned handle to the store.
///
/// The pool is opened on the first call to [`Database::connect`]; later and
/// concurrent calls get the same pool back.
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    pool: OnceCell<DatabasePool>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    /// Wrap an already open pool
    pub fn from_pool(config: DatabaseConfig, pool: DatabasePool) -> Self {
        Self {
            config,
            pool: OnceCell::new_with(Some(pool)),
        }
    }

    /// Connect once; a failed attempt leaves the handle unconnected so it can be retried
    pub async fn connect(&self) -> Result<DatabasePool, EventHubError> {
        let pool = self
            .pool
            .get_or_try_init(|| create_pool(&self.config))
            .await?;
        Ok(pool.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.pool.get().map_or(false, |pool| !pool.is_closed())
    }

    /// Close the pool on shutdown
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            tracing::info!("Database connection pool closed");
        }
    }
}
