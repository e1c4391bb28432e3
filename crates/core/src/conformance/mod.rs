//! Conformance test suite for [`SnapshotStore`] implementations.
//!
//! Backend crates call [`run_conformance_suite`] with a factory that returns a
//! store. The suite covers:
//!
//! - **Claim**: first claims, sequential claims, stale claims that must
//!   conflict and leave nothing behind.
//! - **Read**: latest/specific lookups, ascending version listings, and the
//!   organisation listing with its type filter and limit.
//! - **Concurrent**: many tasks racing for the same version.
//!
//! Every case works on its own entity ids and organisation ids, so a factory
//! may hand back stores that share one database.
//!
//! ```ignore
//! use sitevault_core::conformance::run_conformance_suite;
//!
//! #[sqlx::test]
//! async fn postgres_conformance(pool: PgPool) {
//!     let report = run_conformance_suite(|| {
//!         let pool = pool.clone();
//!         async move { PgSnapshotStore::new(pool) }
//!     })
//!     .await;
//!     assert_eq!(report.failed, 0, "{report}");
//! }
//! ```

mod claim;
mod concurrent;
mod read;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, TimeZone, Utc};

use crate::checksum::{compute_data_checksum, CHECKSUM_ALGORITHM};
use crate::snapshot::{EntityKey, EntityType, Snapshot};
use crate::store::SnapshotStore;
use crate::types::Version;

/// Result of a single conformance case.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Case category (e.g. "claim", "read").
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Failure message, if the case failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL [{}/{}]: {}",
                r.category,
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

/// Run every conformance case against stores produced by `factory`.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: SnapshotStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(claim::run_claim_tests(&factory).await);
    results.extend(read::run_read_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A name no other case in this process has used.
fn unique(prefix: &str) -> String {
    let n = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{n}", std::process::id())
}

fn unique_key(entity_type: EntityType) -> EntityKey {
    EntityKey::new(entity_type, unique("conf-entity"))
}

/// A well-formed snapshot for `key` at `version`, generated `version` minutes
/// after a fixed base instant.
fn make_snapshot(key: &EntityKey, version: Version, organisation_id: &str) -> Snapshot {
    let data = serde_json::json!({
        "entity": key.entity_id,
        "version": version,
        "items": [1, 2.5, "three"],
        "measurements": [
            0.30000000000000004,
            1.7976931348623157e308,
            5e-324,
            971986.3718547629,
        ],
    });
    let base = Utc
        .with_ymd_and_hms(2026, 1, 1, 8, 0, 0)
        .single()
        .unwrap_or_default();
    Snapshot {
        entity_type: key.entity_type,
        entity_id: key.entity_id.clone(),
        version,
        organisation_id: organisation_id.to_string(),
        generated_by: "conformance-user".to_string(),
        generated_at: base + Duration::minutes(version),
        data_checksum: compute_data_checksum(&data),
        data,
        checksum_algorithm: CHECKSUM_ALGORITHM.to_string(),
        pdf_checksum: None,
        is_latest: true,
        filters: Some(serde_json::json!({"source": "conformance"})),
    }
}

/// Claim versions `1..=count` of `key` in order.
async fn seed<S: SnapshotStore>(
    store: &S,
    key: &EntityKey,
    organisation_id: &str,
    count: Version,
) -> Result<(), String> {
    for version in 1..=count {
        let expected = (version > 1).then_some(version - 1);
        store
            .claim_and_insert(expected, &make_snapshot(key, version, organisation_id))
            .await
            .map_err(|e| format!("seed v{version} of {key}: {e}"))?;
    }
    Ok(())
}
