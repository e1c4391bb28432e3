//! The snapshot storage seam.
//!
//! A [`SnapshotStore`] owns two kinds of record per entity key: a version
//! counter and the snapshots themselves. Both are only ever written through
//! [`SnapshotStore::claim_and_insert`]; the trait has no update or
//! delete method.
//!
//! ## Claim semantics
//!
//! `claim_and_insert(expected, snapshot)` is one atomic unit:
//!
//! 1. Compare the key's counter with `expected` (`None` = no counter yet).
//!    On mismatch, return [`StoreError::Conflict`] and change nothing.
//! 2. Set the counter to `snapshot.version` (creating it, owned by
//!    `snapshot.organisation_id`, on first claim).
//! 3. Clear `is_latest` on the previous latest snapshot, if any.
//! 4. Insert `snapshot` with `is_latest = true`.
//!
//! Concurrent readers observe either the state before or after the unit,
//! never a mix, so every key with snapshots has exactly one latest record.
//! The caller guarantees `snapshot.version == expected.unwrap_or(0) + 1`.

mod memory;

pub use memory::MemorySnapshotStore;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::snapshot::{EntityKey, EntityType, Snapshot, SnapshotSummary, VersionMeta};
use crate::types::Version;

/// Errors a storage backend can return.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The counter did not hold the expected version; another writer claimed it.
    #[error("version claim conflict on {entity}: expected current version {expected:?}")]
    Conflict {
        entity: String,
        expected: Option<Version>,
    },

    /// A backend-specific failure (connection, serialization, corrupt row).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { entity, .. } => CoreError::VersionConflict {
                entity,
                attempts: 1,
            },
            StoreError::Backend(msg) => CoreError::Storage(msg),
        }
    }
}

/// Per-entity-key counter record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCounter {
    /// Highest version claimed so far.
    pub current_version: Version,
    /// Organisation that created version 1 and owns the key.
    pub organisation_id: String,
}

/// Durable storage for snapshots.
///
/// Implementations must be `Send + Sync + 'static` so a single instance can
/// sit behind an `Arc` in axum state and be shared across tasks.
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// Read the key's counter without locking.
    async fn read_counter(&self, key: &EntityKey) -> Result<Option<VersionCounter>, StoreError>;

    /// Atomically claim `snapshot.version` and persist `snapshot` as latest.
    async fn claim_and_insert(
        &self,
        expected: Option<Version>,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError>;

    /// Fetch one version, or the latest when `version` is `None`.
    async fn find(
        &self,
        key: &EntityKey,
        version: Option<Version>,
    ) -> Result<Option<Snapshot>, StoreError>;

    /// Metadata of every version of `key`, ascending by version.
    async fn list_versions(&self, key: &EntityKey) -> Result<Vec<VersionMeta>, StoreError>;

    /// Latest-version summaries owned by `organisation_id`, newest first.
    async fn list_latest(
        &self,
        organisation_id: &str,
        entity_type: Option<EntityType>,
        limit: usize,
    ) -> Result<Vec<SnapshotSummary>, StoreError>;

    /// Cheap liveness check.
    async fn ping(&self) -> Result<(), StoreError>;
}
