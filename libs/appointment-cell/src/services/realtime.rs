use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::services::notification::{NotificationError, NotificationEvent, NotificationSink};

pub type NotificationSender = broadcast::Sender<String>;
pub type NotificationReceiver = broadcast::Receiver<String>;

const CHANNEL_CAPACITY: usize = 64;

/// Answers whether a user currently holds a live connection. Injected so
/// presence can live in a shared service when running several instances.
#[async_trait]
pub trait PresenceLookup: Send + Sync {
    async fn is_online(&self, user_id: Uuid) -> bool;
}

#[derive(Default)]
pub struct InMemoryPresence {
    online: RwLock<HashSet<Uuid>>,
}

impl InMemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_online(&self, user_id: Uuid) {
        self.online.write().await.insert(user_id);
    }

    pub async fn set_offline(&self, user_id: Uuid) {
        self.online.write().await.remove(&user_id);
    }
}

#[async_trait]
impl PresenceLookup for InMemoryPresence {
    async fn is_online(&self, user_id: Uuid) -> bool {
        self.online.read().await.contains(&user_id)
    }
}

/// Pushes events to connected users over per-user broadcast channels and
/// hands everyone else to a fallback sink (stored notifications, push, ...).
pub struct RealtimeNotificationHub {
    channels: RwLock<HashMap<Uuid, NotificationSender>>,
    presence: Arc<dyn PresenceLookup>,
    fallback: Arc<dyn NotificationSink>,
}

impl RealtimeNotificationHub {
    pub fn new(presence: Arc<dyn PresenceLookup>, fallback: Arc<dyn NotificationSink>) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            presence,
            fallback,
        }
    }

    pub async fn subscribe(&self, user_id: Uuid) -> NotificationReceiver {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);

        debug!("User {} subscribed to appointment events", user_id);
        sender.subscribe()
    }

    pub async fn unsubscribe(&self, user_id: Uuid) {
        self.channels.write().await.remove(&user_id);
        debug!("Removed event channel for user {}", user_id);
    }

    /// True when the message reached at least one live receiver.
    async fn push(&self, user_id: Uuid, message: &str) -> bool {
        let channels = self.channels.read().await;
        match channels.get(&user_id) {
            Some(sender) => match sender.send(message.to_string()) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Failed to push event to user {}: {}", user_id, e);
                    false
                }
            },
            None => false,
        }
    }
}

#[async_trait]
impl NotificationSink for RealtimeNotificationHub {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), NotificationError> {
        let message = serde_json::to_string(event).map_err(|e| NotificationError::Serialization(e.to_string()))?;
        let mut offline = Vec::new();

        for recipient in &event.recipients {
            let delivered = self.presence.is_online(*recipient).await && self.push(*recipient, &message).await;
            if !delivered {
                offline.push(*recipient);
            }
        }

        if offline.is_empty() {
            return Ok(());
        }

        debug!("Handing {} offline recipients to fallback sink", offline.len());
        let fallback_event = NotificationEvent {
            recipients: offline,
            ..event.clone()
        };
        self.fallback.publish(&fallback_event).await
    }
}
