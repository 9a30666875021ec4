//! Real-time update broadcasting
//!
//! Broadcasts are best-effort: a publish that fails is logged and dropped,
//! and nobody listening is not an error.

use std::sync::Arc;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, OnceCell};
use tracing::debug;
use crate::config::settings::Settings;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_side_effect_failure;

pub const TOPIC_BOOKING_UPDATED: &str = "bookingUpdated";
pub const TOPIC_EVENT_UPDATED: &str = "eventUpdated";

/// A named real-time update with its data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub topic: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, topic: &str, payload: serde_json::Value) -> Result<()>;
}

/// Publish on a background task; failures are logged, never returned
pub fn spawn_broadcast(broadcaster: Arc<dyn Broadcaster>, topic: &'static str, payload: serde_json::Value) {
    tokio::spawn(async move {
        if let Err(e) = broadcaster.broadcast(topic, payload).await {
            log_side_effect_failure("broadcast", &e.to_string(), Some(topic));
        }
    });
}

/// Publishes updates on Redis pub/sub channels named `<prefix><topic>`
pub struct RedisBroadcaster {
    client: Client,
    channel_prefix: String,
    connection: OnceCell<MultiplexedConnection>,
}

impl RedisBroadcaster {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::open(settings.redis.url.as_str())?;

        Ok(Self {
            client,
            channel_prefix: settings.redis.channel_prefix.clone(),
            connection: OnceCell::new(),
        })
    }

    pub fn channel(&self, topic: &str) -> String {
        format!("{}{}", self.channel_prefix, topic)
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        let connection = self
            .connection
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await?;
        Ok(connection.clone())
    }
}

#[async_trait]
impl Broadcaster for RedisBroadcaster {
    async fn broadcast(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        let channel = self.channel(topic);
        let message = serde_json::to_string(&payload)?;
        let mut conn = self.get_connection().await?;

        let receivers: i64 = conn.publish(&channel, message).await?;
        debug!(channel = %channel, receivers = receivers, "Update published");
        Ok(())
    }
}

/// In-process fan-out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<BroadcastMessage>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn broadcast(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        let message = BroadcastMessage {
            topic: topic.to_string(),
            payload,
        };

        // send only fails when there are no subscribers
        if self.sender.send(message).is_err() {
            debug!(topic = topic, "No subscribers for update");
        }
        Ok(())
    }
}

/// Used when real-time updates are switched off
#[derive(Debug, Clone, Default)]
pub struct NoopBroadcaster;

#[async_trait]
impl Broadcaster for NoopBroadcaster {
    async fn broadcast(&self, _topic: &str, _payload: serde_json::Value) -> Result<()> {
        Ok(())
    }
}

/// Pick the broadcaster the settings ask for
pub fn broadcaster_from_settings(settings: &Settings) -> Result<Arc<dyn Broadcaster>> {
    if !settings.features.realtime_updates {
        return Ok(Arc::new(NoopBroadcaster));
    }

    let broadcaster = RedisBroadcaster::new(settings)
        .map_err(|e| EventHubError::Config(format!("Invalid Redis URL: {}", e)))?;
    Ok(Arc::new(broadcaster))
}
