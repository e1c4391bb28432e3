//! In-process [`SnapshotStore`] used for development and tests.
//!
//! All state sits behind one `RwLock`. A claim takes the write lock for the
//! whole compare-and-insert, which makes it atomic with respect to readers.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SnapshotStore, StoreError, VersionCounter};
use crate::snapshot::{EntityKey, EntityType, Snapshot, SnapshotSummary, VersionMeta};
use crate::types::Version;

#[derive(Debug, Default)]
struct MemoryState {
    counters: HashMap<EntityKey, VersionCounter>,
    /// Index `i` holds version `i + 1`.
    snapshots: HashMap<EntityKey, Vec<Snapshot>>,
}

/// Snapshot store backed by process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    state: RwLock<MemoryState>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored payload without touching its checksum, simulating
    /// storage corruption for integrity tests.
    #[cfg(test)]
    pub(crate) async fn corrupt_data(
        &self,
        key: &EntityKey,
        version: Version,
        data: serde_json::Value,
    ) {
        let mut state = self.state.write().await;
        if let Some(snapshot) = state
            .snapshots
            .get_mut(key)
            .and_then(|versions| versions.get_mut(version as usize - 1))
        {
            snapshot.data = data;
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn read_counter(&self, key: &EntityKey) -> Result<Option<VersionCounter>, StoreError> {
        Ok(self.state.read().await.counters.get(key).cloned())
    }

    async fn claim_and_insert(
        &self,
        expected: Option<Version>,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError> {
        let key = snapshot.key();
        let mut state = self.state.write().await;

        let current = state.counters.get(&key).map(|c| c.current_version);
        if current != expected {
            return Err(StoreError::Conflict {
                entity: key.to_string(),
                expected,
            });
        }
        if snapshot.version != expected.unwrap_or(0) + 1 {
            return Err(StoreError::Backend(format!(
                "snapshot version {} does not follow {:?} for {key}",
                snapshot.version, expected
            )));
        }

        state
            .counters
            .entry(key.clone())
            .and_modify(|c| c.current_version = snapshot.version)
            .or_insert_with(|| VersionCounter {
                current_version: snapshot.version,
                organisation_id: snapshot.organisation_id.clone(),
            });

        let versions = state.snapshots.entry(key).or_default();
        if let Some(previous) = versions.last_mut() {
            previous.is_latest = false;
        }
        let mut stored = snapshot.clone();
        stored.is_latest = true;
        versions.push(stored);
        Ok(())
    }

    async fn find(
        &self,
        key: &EntityKey,
        version: Option<Version>,
    ) -> Result<Option<Snapshot>, StoreError> {
        let state = self.state.read().await;
        let Some(versions) = state.snapshots.get(key) else {
            return Ok(None);
        };
        let found = match version {
            None => versions.iter().find(|s| s.is_latest),
            Some(v) if v >= 1 => versions.get(v as usize - 1),
            Some(_) => None,
        };
        Ok(found.cloned())
    }

    async fn list_versions(&self, key: &EntityKey) -> Result<Vec<VersionMeta>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .snapshots
            .get(key)
            .map(|versions| versions.iter().map(Snapshot::meta).collect())
            .unwrap_or_default())
    }

    async fn list_latest(
        &self,
        organisation_id: &str,
        entity_type: Option<EntityType>,
        limit: usize,
    ) -> Result<Vec<SnapshotSummary>, StoreError> {
        let state = self.state.read().await;
        let mut latest: Vec<SnapshotSummary> = state
            .snapshots
            .values()
            .filter_map(|versions| versions.iter().find(|s| s.is_latest))
            .filter(|s| s.organisation_id == organisation_id)
            .filter(|s| entity_type.map_or(true, |t| s.entity_type == t))
            .map(Snapshot::summary)
            .collect();
        latest.sort_by(|a, b| {
            b.generated_at
                .cmp(&a.generated_at)
                .then_with(|| a.entity_type.as_str().cmp(b.entity_type.as_str()))
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        latest.truncate(limit);
        Ok(latest)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::run_conformance_suite;

    #[tokio::test]
    async fn memory_store_passes_conformance_suite() {
        let report = run_conformance_suite(|| async { MemorySnapshotStore::new() }).await;
        assert_eq!(report.failed, 0, "{report}");
        assert!(report.total > 0);
    }
}
