//! PostgreSQL-backed [`SnapshotStore`].
//!
//! A claim runs as one transaction: advance (or create) the key's counter
//! row guarded by the expected version, clear the previous latest row, insert
//! the new row. Under READ COMMITTED a competing claim blocks on the counter
//! row lock, re-checks the guard after the winner commits, and matches zero
//! rows. Zero rows is reported as [`StoreError::Conflict`] and the
//! transaction is rolled back.

use async_trait::async_trait;

use sitevault_core::canonical;
use sitevault_core::snapshot::{EntityKey, EntityType, Snapshot, SnapshotSummary, VersionMeta};
use sitevault_core::store::{SnapshotStore, StoreError, VersionCounter};
use sitevault_core::types::Version;

use crate::repositories::snapshot_repo::EncodedPayload;
use crate::repositories::SnapshotRepo;
use crate::DbPool;

/// Snapshot store over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgSnapshotStore {
    pool: DbPool,
}

impl PgSnapshotStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn conflict(key: &EntityKey, expected: Option<Version>) -> StoreError {
    StoreError::Conflict {
        entity: key.to_string(),
        expected,
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn read_counter(&self, key: &EntityKey) -> Result<Option<VersionCounter>, StoreError> {
        Ok(SnapshotRepo::find_counter(&self.pool, key)
            .await
            .map_err(backend)?
            .map(VersionCounter::from))
    }

    async fn claim_and_insert(
        &self,
        expected: Option<Version>,
        snapshot: &Snapshot,
    ) -> Result<(), StoreError> {
        let key = snapshot.key();
        if snapshot.version != expected.unwrap_or(0) + 1 {
            return Err(StoreError::Backend(format!(
                "snapshot version {} does not follow {expected:?} for {key}",
                snapshot.version
            )));
        }

        let data_json = canonical::to_canonical_string(&snapshot.data);
        let filters_json = snapshot.filters.as_ref().map(canonical::to_canonical_string);

        let mut tx = self.pool.begin().await.map_err(backend)?;

        let claimed = match expected {
            None => SnapshotRepo::claim_first(&mut *tx, &key, &snapshot.organisation_id).await,
            Some(current) => SnapshotRepo::claim_next(&mut *tx, &key, current).await,
        }
        .map_err(backend)?;
        if !claimed {
            tx.rollback().await.map_err(backend)?;
            return Err(conflict(&key, expected));
        }

        SnapshotRepo::clear_latest(&mut *tx, &key)
            .await
            .map_err(backend)?;

        let payload = EncodedPayload {
            data_json: &data_json,
            filters_json: filters_json.as_deref(),
        };
        match SnapshotRepo::insert(&mut *tx, snapshot, payload).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(conflict(&key, expected));
            }
            Err(e) => return Err(backend(e)),
        }

        tx.commit().await.map_err(backend)?;
        tracing::debug!(
            entity_type = %key.entity_type,
            entity_id = %key.entity_id,
            version = snapshot.version,
            "Snapshot row committed"
        );
        Ok(())
    }

    async fn find(
        &self,
        key: &EntityKey,
        version: Option<Version>,
    ) -> Result<Option<Snapshot>, StoreError> {
        let row = match version {
            None => SnapshotRepo::find_latest(&self.pool, key).await,
            Some(v) => SnapshotRepo::find_version(&self.pool, key, v).await,
        }
        .map_err(backend)?;
        row.map(Snapshot::try_from).transpose()
    }

    async fn list_versions(&self, key: &EntityKey) -> Result<Vec<VersionMeta>, StoreError> {
        let rows = SnapshotRepo::list_versions(&self.pool, key)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(VersionMeta::from).collect())
    }

    async fn list_latest(
        &self,
        organisation_id: &str,
        entity_type: Option<EntityType>,
        limit: usize,
    ) -> Result<Vec<SnapshotSummary>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        SnapshotRepo::list_latest_by_organisation(&self.pool, organisation_id, entity_type, limit)
            .await
            .map_err(backend)?
            .into_iter()
            .map(SnapshotSummary::try_from)
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(backend)
    }
}
