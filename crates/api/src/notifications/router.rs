//! Admin notification routing for snapshot events.
//!
//! [`NotificationRouter`] subscribes to the [`EventBus`](sitevault_events::EventBus)
//! and turns each submitted DPR into an admin notification. Delivery
//! channels are out of scope here: notifications are written to the log.
//! The loop exits when the bus is dropped.

use tokio::sync::broadcast;

use sitevault_core::snapshot::EntityType;
use sitevault_core::types::Version;

use sitevault_events::{SnapshotEvent, EVENT_SNAPSHOT_CREATED};

/// Title of the notification raised when a DPR snapshot is created.
pub const DPR_SUBMITTED_TITLE: &str = "New DPR Submitted";

/// An admin-facing notification derived from a snapshot event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminNotification {
    pub organisation_id: String,
    pub title: &'static str,
    pub message: String,
    pub entity_id: String,
    pub version: Version,
}

/// Background service that routes snapshot events to admin notifications.
pub struct NotificationRouter;

impl NotificationRouter {
    /// Map an event to the notification it should raise, if any.
    pub fn route(event: &SnapshotEvent) -> Option<AdminNotification> {
        if event.event_type != EVENT_SNAPSHOT_CREATED || event.entity_type != EntityType::Dpr {
            return None;
        }
        Some(AdminNotification {
            organisation_id: event.organisation_id.clone(),
            title: DPR_SUBMITTED_TITLE,
            message: format!(
                "DPR {} was submitted by {} (snapshot version {})",
                event.entity_id, event.actor_user_id, event.version
            ),
            entity_id: event.entity_id.clone(),
            version: event.version,
        })
    }

    /// Run the routing loop until the bus closes. Returns how many
    /// notifications were raised.
    pub async fn run(mut receiver: broadcast::Receiver<SnapshotEvent>) -> u64 {
        let mut raised = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(notification) = Self::route(&event) {
                        raised += 1;
                        tracing::info!(
                            organisation_id = %notification.organisation_id,
                            entity_id = %notification.entity_id,
                            version = notification.version,
                            title = notification.title,
                            "{}",
                            notification.message
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged, events were skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
        raised
    }
}
