//! Test context for integration tests
//!
//! Wires the real services against a test database, with a recording
//! notifier and an in-process broadcaster standing in for SMTP and Redis.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::broadcast::Receiver;
use EventHub::models::{Caller, Event, Role, User, UserContact};
use EventHub::services::{BroadcastMessage, ChannelBroadcaster, NotificationDispatcher, ServiceFactory};
use EventHub::{DatabaseService, EventHubError, Settings};

use super::database_helper::TestDatabase;
use super::test_data::{event_request, user_request};

/// Notifier that records what it was asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    confirmations: Mutex<Vec<(i64, i64)>>,
    reminders: Mutex<Vec<(i64, i64)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Make every following send fail
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// `(user_id, event_id)` pairs of confirmations sent
    pub fn confirmations(&self) -> Vec<(i64, i64)> {
        self.confirmations.lock().unwrap().clone()
    }

    /// `(user_id, event_id)` pairs of reminders sent
    pub fn reminders(&self) -> Vec<(i64, i64)> {
        self.reminders.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), EventHubError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EventHubError::Email("SMTP unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifier {
    async fn notify_booking_confirmed(&self, user: &UserContact, event: &Event) -> Result<(), EventHubError> {
        self.check()?;
        self.confirmations.lock().unwrap().push((user.id, event.id));
        Ok(())
    }

    async fn notify_event_reminder(&self, user: &UserContact, event: &Event) -> Result<(), EventHubError> {
        self.check()?;
        self.reminders.lock().unwrap().push((user.id, event.id));
        Ok(())
    }
}

/// Everything an integration test needs
pub struct TestContext {
    pub database: TestDatabase,
    pub db: DatabaseService,
    pub services: ServiceFactory,
    pub notifier: Arc<RecordingNotifier>,
    pub broadcaster: ChannelBroadcaster,
}

impl TestContext {
    pub async fn new() -> Result<Self, sqlx::Error> {
        let database = TestDatabase::new().await?;
        let db = DatabaseService::new(database.pool.clone());
        let notifier = Arc::new(RecordingNotifier::default());
        let broadcaster = ChannelBroadcaster::new(64);

        let settings = Settings::default();
        let services = ServiceFactory::with_collaborators(
            &settings,
            db.clone(),
            notifier.clone(),
            Arc::new(broadcaster.clone()),
        );

        Ok(Self {
            database,
            db,
            services,
            notifier,
            broadcaster,
        })
    }

    pub fn subscribe(&self) -> Receiver<BroadcastMessage> {
        self.broadcaster.subscribe()
    }

    /// Register a user and return it with its caller identity
    pub async fn create_user(&self, role: Role) -> (User, Caller) {
        let user = self.db.users.create(user_request(role)).await.expect("Failed to create user");
        let caller = Caller::from(&user);
        (user, caller)
    }

    /// An approved event created by a fresh admin, dated a week out
    pub async fn create_approved_event(&self, name: &str, capacity: i64) -> Event {
        let (_, admin) = self.create_user(Role::Admin).await;
        self.services
            .event_service
            .create_event(event_request(name, capacity, 7), &admin)
            .await
            .expect("Failed to create event")
    }
}

/// Poll until `condition` holds or two seconds pass
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..40 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

/// Next broadcast on `topic`, skipping others, within two seconds
pub async fn next_broadcast(receiver: &mut Receiver<BroadcastMessage>, topic: &str) -> Option<BroadcastMessage> {
    let wait = async {
        loop {
            match receiver.recv().await {
                Ok(message) if message.topic == topic => return Some(message),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    };

    tokio::time::timeout(Duration::from_secs(2), wait).await.ok().flatten()
}
