//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`SnapshotEvent`]s. It is
//! shared via `Arc<EventBus>` between the engine (as its notifier) and any
//! background subscribers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use sitevault_core::notify::{NotifyError, SnapshotCreated, SnapshotNotifier};
use sitevault_core::snapshot::EntityType;
use sitevault_core::types::Version;

/// Event name published after a snapshot is durably written.
pub const EVENT_SNAPSHOT_CREATED: &str = "snapshot.created";

// ---------------------------------------------------------------------------
// SnapshotEvent
// ---------------------------------------------------------------------------

/// A snapshot lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEvent {
    /// Dot-separated event name, e.g. `"snapshot.created"`.
    pub event_type: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub version: Version,
    pub organisation_id: String,
    /// User whose action produced the snapshot.
    pub actor_user_id: String,
    /// Event-specific data.
    pub payload: serde_json::Value,
    /// When the event was published (UTC).
    pub timestamp: DateTime<Utc>,
}

impl SnapshotEvent {
    /// Build a `snapshot.created` event from the engine's notification.
    pub fn created(created: &SnapshotCreated) -> Self {
        Self {
            event_type: EVENT_SNAPSHOT_CREATED.to_string(),
            entity_type: created.entity_type,
            entity_id: created.entity_id.clone(),
            version: created.version,
            organisation_id: created.organisation_id.clone(),
            actor_user_id: created.generated_by.clone(),
            payload: serde_json::json!({
                "data_checksum": created.data_checksum,
                "generated_at": created.generated_at,
            }),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use sitevault_events::EventBus;
///
/// let bus = EventBus::default();
/// let rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// # drop(rx);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<SnapshotEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that will see it, or `None` when
    /// nobody is listening and the event was dropped.
    pub fn publish(&self, event: SnapshotEvent) -> Option<usize> {
        self.sender.send(event).ok()
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl SnapshotNotifier for EventBus {
    async fn snapshot_created(&self, event: &SnapshotCreated) -> Result<(), NotifyError> {
        match self.publish(SnapshotEvent::created(event)) {
            Some(_) => Ok(()),
            None => Err(NotifyError::NoSubscribers(EVENT_SNAPSHOT_CREATED.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
