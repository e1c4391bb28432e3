//! Snapshot records, entity keys and the caller identity.
//!
//! A [`Snapshot`] is one frozen, checksummed capture of an entity key's state.
//! Once built by the engine it is never mutated; the store only ever clears
//! the `is_latest` flag of the previous version when a newer one is written.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{Timestamp, Version};

// ---------------------------------------------------------------------------
// Entity type
// ---------------------------------------------------------------------------

/// Business records whose finalized state can be frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Daily progress report.
    Dpr,
    WorkOrder,
    PaymentCertificate,
}

impl EntityType {
    /// All entity types, in declaration order.
    pub const ALL: [EntityType; 3] = [
        EntityType::Dpr,
        EntityType::WorkOrder,
        EntityType::PaymentCertificate,
    ];

    /// The stored name (`"DPR"`, `"WORK_ORDER"`, `"PAYMENT_CERTIFICATE"`).
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Dpr => "DPR",
            EntityType::WorkOrder => "WORK_ORDER",
            EntityType::PaymentCertificate => "PAYMENT_CERTIFICATE",
        }
    }

    /// Parse a stored or user-supplied name. Matching ignores ASCII case.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown entity type '{name}'. Must be one of: DPR, WORK_ORDER, PAYMENT_CERTIFICATE"
                ))
            })
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

// ---------------------------------------------------------------------------
// Entity key
// ---------------------------------------------------------------------------

/// Identifies one logical record whose history is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

// ---------------------------------------------------------------------------
// Caller
// ---------------------------------------------------------------------------

/// The authenticated identity on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub organisation_id: String,
    pub role: String,
}

impl Caller {
    pub fn new(
        user_id: impl Into<String>,
        organisation_id: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            organisation_id: organisation_id.into(),
            role: role.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One immutable, versioned, checksummed capture of an entity's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub version: Version,
    /// Tenant owner, taken from the creating caller.
    pub organisation_id: String,
    pub generated_by: String,
    pub generated_at: Timestamp,
    /// The frozen business payload.
    pub data: serde_json::Value,
    /// Lowercase hex digest of the canonical serialization of `data`.
    pub data_checksum: String,
    /// Algorithm that produced `data_checksum` (always `"sha256"` today).
    pub checksum_algorithm: String,
    /// Digest of an associated rendered artifact (e.g. the submitted PDF).
    pub pdf_checksum: Option<String>,
    pub is_latest: bool,
    /// How `data` was derived. Kept for audit only, never re-applied.
    pub filters: Option<serde_json::Value>,
}

impl Snapshot {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type, self.entity_id.clone())
    }

    /// Metadata view without the `data` payload.
    pub fn meta(&self) -> VersionMeta {
        VersionMeta {
            version: self.version,
            generated_at: self.generated_at,
            generated_by: self.generated_by.clone(),
            is_latest: self.is_latest,
            data_checksum: self.data_checksum.clone(),
            pdf_checksum: self.pdf_checksum.clone(),
        }
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            entity_type: self.entity_type,
            entity_id: self.entity_id.clone(),
            version: self.version,
            generated_at: self.generated_at,
            generated_by: self.generated_by.clone(),
            data_checksum: self.data_checksum.clone(),
            pdf_checksum: self.pdf_checksum.clone(),
        }
    }
}

/// Per-version metadata returned by version listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMeta {
    pub version: Version,
    pub generated_at: Timestamp,
    pub generated_by: String,
    pub is_latest: bool,
    pub data_checksum: String,
    pub pdf_checksum: Option<String>,
}

/// Latest-version metadata for one entity key, used by organisation listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub version: Version,
    pub generated_at: Timestamp,
    pub generated_by: String,
    pub data_checksum: String,
    pub pdf_checksum: Option<String>,
}

/// What a create call hands back to the workflow that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotReceipt {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub version: Version,
    pub data_checksum: String,
}

impl From<&Snapshot> for SnapshotReceipt {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            entity_type: snapshot.entity_type,
            entity_id: snapshot.entity_id.clone(),
            version: snapshot.version,
            data_checksum: snapshot.data_checksum.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Create input
// ---------------------------------------------------------------------------

/// Maximum length of an entity id.
pub const MAX_ENTITY_ID_LEN: u64 = 128;

/// Request to freeze an entity's current computed state.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewSnapshot {
    pub entity_type: EntityType,
    #[validate(length(min = 1, max = MAX_ENTITY_ID_LEN))]
    pub entity_id: String,
    pub data: serde_json::Value,
    #[serde(default)]
    pub filters: Option<serde_json::Value>,
    #[serde(default)]
    pub pdf_checksum: Option<String>,
}

impl NewSnapshot {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            data,
            filters: None,
            pdf_checksum: None,
        }
    }

    pub fn with_filters(mut self, filters: serde_json::Value) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_pdf_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.pdf_checksum = Some(checksum.into());
        self
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type, self.entity_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_round_trips_through_names() {
        for t in EntityType::ALL {
            assert_eq!(EntityType::from_name(t.as_str()).unwrap(), t);
        }
        assert_eq!("work_order".parse::<EntityType>().unwrap(), EntityType::WorkOrder);
    }

    #[test]
    fn unknown_entity_type_is_a_validation_error() {
        let err = EntityType::from_name("BUDGET").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn entity_type_serializes_as_stored_name() {
        let json = serde_json::to_value(EntityType::PaymentCertificate).unwrap();
        assert_eq!(json, "PAYMENT_CERTIFICATE");
        let parsed: EntityType = serde_json::from_value(serde_json::json!("DPR")).unwrap();
        assert_eq!(parsed, EntityType::Dpr);
    }

    #[test]
    fn entity_key_displays_type_and_id() {
        let key = EntityKey::new(EntityType::Dpr, "dpr-1");
        assert_eq!(key.to_string(), "DPR/dpr-1");
    }

    #[test]
    fn empty_entity_id_fails_validation() {
        let input = NewSnapshot::new(EntityType::Dpr, "", serde_json::json!({}));
        assert!(input.validate().is_err());

        let long = "x".repeat(MAX_ENTITY_ID_LEN as usize + 1);
        let input = NewSnapshot::new(EntityType::Dpr, long, serde_json::json!({}));
        assert!(input.validate().is_err());

        let input = NewSnapshot::new(EntityType::Dpr, "dpr-1", serde_json::json!({}));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn entity_id_length_is_capped_at_max_entity_id_len() {
        let at_limit = "w".repeat(MAX_ENTITY_ID_LEN as usize);
        let input = NewSnapshot::new(EntityType::WorkOrder, at_limit, serde_json::json!({}));
        assert!(input.validate().is_ok());

        let over = "w".repeat(129);
        let input = NewSnapshot::new(EntityType::WorkOrder, over, serde_json::json!({}));
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("entity_id"));
    }
}
