//! Repository for the `snapshot_counters` and `snapshots` tables.
//!
//! Snapshots are insert-only. The only UPDATE issued against `snapshots`
//! clears `is_latest` on the superseded row, inside the same transaction that
//! inserts its successor; the table trigger rejects anything else.

use sqlx::{PgConnection, PgPool};

use sitevault_core::snapshot::{EntityKey, EntityType, Snapshot};
use sitevault_core::types::Version;

use crate::models::snapshot::{CounterRow, SnapshotRow, SummaryRow, VersionMetaRow};

/// Column list for full snapshot queries.
const COLUMNS: &str = "entity_type, entity_id, version, organisation_id, generated_by, \
    generated_at, data_json, data_checksum, checksum_algorithm, pdf_checksum, is_latest, \
    filters_json";

/// Column list for version metadata queries.
const META_COLUMNS: &str =
    "version, generated_at, generated_by, is_latest, data_checksum, pdf_checksum";

/// Column list for organisation summaries.
const SUMMARY_COLUMNS: &str =
    "entity_type, entity_id, version, generated_at, generated_by, data_checksum, pdf_checksum";

/// Canonical JSON text of a snapshot's payload and filters.
pub struct EncodedPayload<'a> {
    pub data_json: &'a str,
    pub filters_json: Option<&'a str>,
}

/// Provides counter claims, inserts and reads for snapshots.
pub struct SnapshotRepo;

impl SnapshotRepo {
    // -- counters ----------------------------------------------------------

    /// Read a key's counter.
    pub async fn find_counter(
        pool: &PgPool,
        key: &EntityKey,
    ) -> Result<Option<CounterRow>, sqlx::Error> {
        sqlx::query_as::<_, CounterRow>(
            "SELECT organisation_id, current_version FROM snapshot_counters \
             WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(key.entity_type.as_str())
        .bind(&key.entity_id)
        .fetch_optional(pool)
        .await
    }

    /// Create the counter at version 1. Returns `false` if another writer
    /// already created it.
    pub async fn claim_first(
        conn: &mut PgConnection,
        key: &EntityKey,
        organisation_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO snapshot_counters (entity_type, entity_id, organisation_id, current_version) \
             VALUES ($1, $2, $3, 1) \
             ON CONFLICT (entity_type, entity_id) DO NOTHING",
        )
        .bind(key.entity_type.as_str())
        .bind(&key.entity_id)
        .bind(organisation_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Move the counter from `expected` to `expected + 1`. Returns `false`
    /// if the counter no longer holds `expected`.
    pub async fn claim_next(
        conn: &mut PgConnection,
        key: &EntityKey,
        expected: Version,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE snapshot_counters \
             SET current_version = current_version + 1, updated_at = now() \
             WHERE entity_type = $1 AND entity_id = $2 AND current_version = $3",
        )
        .bind(key.entity_type.as_str())
        .bind(&key.entity_id)
        .bind(expected)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    // -- snapshots ---------------------------------------------------------

    /// Clear `is_latest` on the key's current latest row, if any.
    pub async fn clear_latest(conn: &mut PgConnection, key: &EntityKey) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE snapshots SET is_latest = false \
             WHERE entity_type = $1 AND entity_id = $2 AND is_latest",
        )
        .bind(key.entity_type.as_str())
        .bind(&key.entity_id)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Insert a snapshot row as the key's latest.
    pub async fn insert(
        conn: &mut PgConnection,
        snapshot: &Snapshot,
        payload: EncodedPayload<'_>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO snapshots (entity_type, entity_id, version, organisation_id, generated_by, \
                 generated_at, data_json, data_checksum, checksum_algorithm, pdf_checksum, \
                 is_latest, filters_json) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, true, $11)",
        )
        .bind(snapshot.entity_type.as_str())
        .bind(&snapshot.entity_id)
        .bind(snapshot.version)
        .bind(&snapshot.organisation_id)
        .bind(&snapshot.generated_by)
        .bind(snapshot.generated_at)
        .bind(payload.data_json)
        .bind(&snapshot.data_checksum)
        .bind(&snapshot.checksum_algorithm)
        .bind(snapshot.pdf_checksum.as_deref())
        .bind(payload.filters_json)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Find the latest snapshot of a key.
    pub async fn find_latest(
        pool: &PgPool,
        key: &EntityKey,
    ) -> Result<Option<SnapshotRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM snapshots \
             WHERE entity_type = $1 AND entity_id = $2 AND is_latest"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(key.entity_type.as_str())
            .bind(&key.entity_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a specific version of a key.
    pub async fn find_version(
        pool: &PgPool,
        key: &EntityKey,
        version: Version,
    ) -> Result<Option<SnapshotRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM snapshots \
             WHERE entity_type = $1 AND entity_id = $2 AND version = $3"
        );
        sqlx::query_as::<_, SnapshotRow>(&query)
            .bind(key.entity_type.as_str())
            .bind(&key.entity_id)
            .bind(version)
            .fetch_optional(pool)
            .await
    }

    /// List version metadata for a key, oldest first.
    pub async fn list_versions(
        pool: &PgPool,
        key: &EntityKey,
    ) -> Result<Vec<VersionMetaRow>, sqlx::Error> {
        let query = format!(
            "SELECT {META_COLUMNS} FROM snapshots \
             WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY version ASC"
        );
        sqlx::query_as::<_, VersionMetaRow>(&query)
            .bind(key.entity_type.as_str())
            .bind(&key.entity_id)
            .fetch_all(pool)
            .await
    }

    /// List latest-version summaries for an organisation, newest first.
    pub async fn list_latest_by_organisation(
        pool: &PgPool,
        organisation_id: &str,
        entity_type: Option<EntityType>,
        limit: i64,
    ) -> Result<Vec<SummaryRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM snapshots \
             WHERE organisation_id = $1 AND is_latest \
               AND ($2::TEXT IS NULL OR entity_type = $2) \
             ORDER BY generated_at DESC, entity_type COLLATE \"C\" ASC, entity_id COLLATE \"C\" ASC \
             LIMIT $3"
        );
        sqlx::query_as::<_, SummaryRow>(&query)
            .bind(organisation_id)
            .bind(entity_type.map(EntityType::as_str))
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
