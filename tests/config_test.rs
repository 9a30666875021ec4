//! Configuration loading tests

use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;
use EventHub::{EventHubError, Settings};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(contents.as_bytes()).expect("Failed to write config");
    file
}

#[test]
#[serial]
fn test_file_values_override_defaults() {
    let file = write_config(
        r#"
[database]
url = "postgresql://db.internal/events"
max_connections = 25

[reminders]
run_at_hour = 7
lookahead_days = 2

[email]
enabled = true
smtp_host = "smtp.example.com"
from_address = "events@example.com"
"#,
    );

    let settings = Settings::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(settings.database.url, "postgresql://db.internal/events");
    assert_eq!(settings.database.max_connections, 25);
    assert_eq!(settings.database.min_connections, 1);
    assert_eq!(settings.reminders.run_at_hour, 7);
    assert_eq!(settings.reminders.lookahead_days, 2);
    assert!(settings.email.enabled);
    assert_eq!(settings.email.smtp_port, 587);
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = write_config(
        r#"
[database]
url = "postgresql://from-file/events"
"#,
    );

    std::env::set_var("EVENTHUB_DATABASE__URL", "postgresql://from-env/events");
    std::env::set_var("EVENTHUB_LOGGING__JSON", "true");
    let settings = Settings::from_file(file.path().to_str().unwrap());
    std::env::remove_var("EVENTHUB_DATABASE__URL");
    std::env::remove_var("EVENTHUB_LOGGING__JSON");

    let settings = settings.unwrap();
    assert_eq!(settings.database.url, "postgresql://from-env/events");
    assert!(settings.logging.json);
}

#[test]
#[serial]
fn test_invalid_file_values_fail_validation() {
    let file = write_config(
        r#"
[reminders]
run_at_hour = 30
"#,
    );

    let settings = Settings::from_file(file.path().to_str().unwrap()).unwrap();
    assert!(matches!(settings.validate(), Err(EventHubError::Config(_))));
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent");

    let settings = Settings::from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(settings.database.url, Settings::default().database.url);
    assert!(settings.validate().is_ok());
}

#[test]
#[serial]
fn test_serialized_settings_load_back() {
    let mut original = Settings::default();
    original.reminders.run_at_hour = 6;
    original.features.realtime_updates = false;
    original.redis.channel_prefix = "staging".to_string();

    let rendered = toml::to_string(&original).expect("Failed to serialize settings");
    let file = write_config(&rendered);

    let loaded = Settings::from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(loaded.reminders.run_at_hour, 6);
    assert!(!loaded.features.realtime_updates);
    assert_eq!(loaded.redis.channel_prefix, "staging");
    assert!(loaded.validate().is_ok());
}
