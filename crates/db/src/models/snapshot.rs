//! Snapshot row models.
//!
//! Rows store `entity_type` as its name and `data`/`filters` as canonical
//! JSON text; conversion into core types parses both back.

use sqlx::FromRow;

use sitevault_core::snapshot::{EntityType, Snapshot, SnapshotSummary, VersionMeta};
use sitevault_core::store::{StoreError, VersionCounter};
use sitevault_core::types::{Timestamp, Version};

/// A full row from the `snapshots` table.
#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    pub entity_type: String,
    pub entity_id: String,
    pub version: Version,
    pub organisation_id: String,
    pub generated_by: String,
    pub generated_at: Timestamp,
    pub data_json: String,
    pub data_checksum: String,
    pub checksum_algorithm: String,
    pub pdf_checksum: Option<String>,
    pub is_latest: bool,
    pub filters_json: Option<String>,
}

impl TryFrom<SnapshotRow> for Snapshot {
    type Error = StoreError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let data = parse_json(&row.data_json, "data_json")?;
        let filters = row
            .filters_json
            .as_deref()
            .map(|f| parse_json(f, "filters_json"))
            .transpose()?;
        Ok(Snapshot {
            entity_type: parse_entity_type(&row.entity_type)?,
            entity_id: row.entity_id,
            version: row.version,
            organisation_id: row.organisation_id,
            generated_by: row.generated_by,
            generated_at: row.generated_at,
            data,
            data_checksum: row.data_checksum,
            checksum_algorithm: row.checksum_algorithm,
            pdf_checksum: row.pdf_checksum,
            is_latest: row.is_latest,
            filters,
        })
    }
}

/// Version metadata columns (no payload).
#[derive(Debug, Clone, FromRow)]
pub struct VersionMetaRow {
    pub version: Version,
    pub generated_at: Timestamp,
    pub generated_by: String,
    pub is_latest: bool,
    pub data_checksum: String,
    pub pdf_checksum: Option<String>,
}

impl From<VersionMetaRow> for VersionMeta {
    fn from(row: VersionMetaRow) -> Self {
        VersionMeta {
            version: row.version,
            generated_at: row.generated_at,
            generated_by: row.generated_by,
            is_latest: row.is_latest,
            data_checksum: row.data_checksum,
            pdf_checksum: row.pdf_checksum,
        }
    }
}

/// Latest-version summary columns.
#[derive(Debug, Clone, FromRow)]
pub struct SummaryRow {
    pub entity_type: String,
    pub entity_id: String,
    pub version: Version,
    pub generated_at: Timestamp,
    pub generated_by: String,
    pub data_checksum: String,
    pub pdf_checksum: Option<String>,
}

impl TryFrom<SummaryRow> for SnapshotSummary {
    type Error = StoreError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(SnapshotSummary {
            entity_type: parse_entity_type(&row.entity_type)?,
            entity_id: row.entity_id,
            version: row.version,
            generated_at: row.generated_at,
            generated_by: row.generated_by,
            data_checksum: row.data_checksum,
            pdf_checksum: row.pdf_checksum,
        })
    }
}

/// A row from the `snapshot_counters` table.
#[derive(Debug, Clone, FromRow)]
pub struct CounterRow {
    pub organisation_id: String,
    pub current_version: Version,
}

impl From<CounterRow> for VersionCounter {
    fn from(row: CounterRow) -> Self {
        VersionCounter {
            current_version: row.current_version,
            organisation_id: row.organisation_id,
        }
    }
}

fn parse_entity_type(name: &str) -> Result<EntityType, StoreError> {
    EntityType::from_name(name)
        .map_err(|_| StoreError::Backend(format!("unknown entity_type '{name}' in snapshots row")))
}

fn parse_json(text: &str, column: &str) -> Result<serde_json::Value, StoreError> {
    serde_json::from_str(text)
        .map_err(|e| StoreError::Backend(format!("corrupt {column} in snapshots row: {e}")))
}
