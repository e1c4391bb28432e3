//! Best-effort notification seam for snapshot creation.
//!
//! A notifier failure never rolls back or blocks a create. The engine logs
//! it at `warn` and counts it (see
//! [`SnapshotEngine::notification_failures`](crate::engine::SnapshotEngine::notification_failures)).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::snapshot::{EntityType, Snapshot};
use crate::types::{Timestamp, Version};

/// Emitted once a snapshot has been durably written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCreated {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub version: Version,
    pub organisation_id: String,
    pub generated_by: String,
    pub generated_at: Timestamp,
    pub data_checksum: String,
}

impl From<&Snapshot> for SnapshotCreated {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            entity_type: snapshot.entity_type,
            entity_id: snapshot.entity_id.clone(),
            version: snapshot.version,
            organisation_id: snapshot.organisation_id.clone(),
            generated_by: snapshot.generated_by.clone(),
            generated_at: snapshot.generated_at,
            data_checksum: snapshot.data_checksum.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no subscribers for {0}")]
    NoSubscribers(String),

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Receives snapshot lifecycle notifications.
#[async_trait]
pub trait SnapshotNotifier: Send + Sync + 'static {
    async fn snapshot_created(&self, event: &SnapshotCreated) -> Result<(), NotifyError>;
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl SnapshotNotifier for NoopNotifier {
    async fn snapshot_created(&self, _event: &SnapshotCreated) -> Result<(), NotifyError> {
        Ok(())
    }
}
