use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::kind::MessageKind;
use crate::message::RawMessage;
use crate::registry::MessageRegistry;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Raised once per `MessageCache::set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageUpdated {
    pub key: MessageKind,
    /// Registered type for `key`, if any.
    pub type_name: Option<&'static str>,
}

/// Latest raw payload per message kind.
///
/// `set` may run on the connection's read loop while `get` runs elsewhere.
/// Entries are swapped whole, so readers never see a partial write.
pub struct MessageCache {
    entries: RwLock<HashMap<MessageKind, Arc<RawMessage>>>,
    registry: Arc<MessageRegistry>,
    updates: broadcast::Sender<MessageUpdated>,
}

impl MessageCache {
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            registry,
            updates,
        }
    }

    /// Replace the entry for the message's key and notify subscribers.
    ///
    /// Always notifies, even when the payload equals the previous one.
    pub fn set(&self, message: RawMessage) -> MessageUpdated {
        let key = message.key();
        let update = MessageUpdated {
            key,
            type_name: self.registry.type_name(key),
        };

        let mut entries = self.entries.write();
        entries.insert(key, Arc::new(message));
        // Sent under the lock so per-key notification order matches store order.
        let receivers = self.updates.send(update).unwrap_or(0);
        drop(entries);

        debug!(%key, receivers, "Cached message");
        update
    }

    pub fn get(&self, key: MessageKind) -> Option<Arc<RawMessage>> {
        self.entries.read().get(&key).cloned()
    }

    pub fn contains(&self, key: MessageKind) -> bool {
        self.entries.read().contains_key(&key)
    }

    /// Subscribe to update notifications. Drop the receiver to unsubscribe.
    ///
    /// A receiver that falls more than the channel capacity behind sees
    /// `RecvError::Lagged` and skips the oldest notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<MessageUpdated> {
        self.updates.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.updates.receiver_count()
    }

    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.registry
    }

    pub fn keys(&self) -> Vec<MessageKind> {
        let mut keys: Vec<_> = self.entries.read().keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Discard every entry at once. Subscribers stay registered.
    pub fn clear(&self) {
        let discarded = std::mem::take(&mut *self.entries.write());
        debug!(entries = discarded.len(), "Discarded cached messages");
    }
}

impl std::fmt::Debug for MessageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCache")
            .field("keys", &self.keys())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
