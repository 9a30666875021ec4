//! EventHub
//!
//! Event lifecycle and booking capacity engine. Events move between pending,
//! approved and rejected; owner edits to approved events are staged for admin
//! review; bookings are capped by event capacity and limited to one active
//! booking per user.

#![allow(non_snake_case)]

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{EventHubError, ErrorKind, Result};

// Re-export main components for easy access
pub use database::{Database, DatabaseService};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
