//! EventHub reminder worker
//!
//! Main application entry point

use anyhow::Context;
use tracing::{info, warn};

use EventHub::{
    config::Settings,
    database::{run_migrations, Database, DatabaseService},
    services::ServiceFactory,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load settings")?;
    settings.validate()?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", EventHub::info());

    // Initialize database connection
    info!("Connecting to database...");
    let database = Database::new(settings.database.clone());
    let pool = database.connect().await.context("failed to connect to database")?;

    run_migrations(&pool).await?;

    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, DatabaseService::new(pool))?;

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!(issue = %issue, "Service health issue");
    }

    info!("Reminder worker is ready");

    services
        .reminder_job
        .run_scheduler(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await;

    database.close().await;
    info!("EventHub reminder worker has been shut down.");

    Ok(())
}
