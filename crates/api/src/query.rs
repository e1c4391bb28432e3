//! Shared query parameter types for snapshot endpoints.

use serde::Deserialize;
use sitevault_core::types::Version;

/// `?version=N` selector. Absent means the latest version.
#[derive(Debug, Default, Deserialize)]
pub struct VersionParams {
    pub version: Option<Version>,
}

/// Query parameters for reading one snapshot.
#[derive(Debug, Default, Deserialize)]
pub struct SnapshotQuery {
    pub version: Option<Version>,
    /// When `true`, fail with `CHECKSUM_MISMATCH` instead of returning a
    /// corrupted payload.
    #[serde(default)]
    pub verify: bool,
}

/// Query parameters for rendering a snapshot.
#[derive(Debug, Default, Deserialize)]
pub struct RenderParams {
    pub version: Option<Version>,
    /// Output format name (default: `json`).
    pub format: Option<String>,
}

/// Query parameters for the organisation listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Restrict to one entity type (e.g. `DPR`).
    pub entity_type: Option<String>,
    /// Page size (default 100, clamped to 1..=500).
    pub limit: Option<usize>,
}
