//! The snapshot engine: the operations workflows call to freeze, read,
//! verify and render entity snapshots.
//!
//! The engine owns no state of its own beyond configuration and a failure
//! counter. Version allocation and the latest flip are delegated to the
//! store's atomic [`SnapshotStore::claim_and_insert`]; the engine only
//! retries lost claims.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use validator::Validate;

use crate::checksum::{self, ChecksumVerification, CHECKSUM_ALGORITHM};
use crate::clock::{Clock, SystemClock};
use crate::error::CoreError;
use crate::guard::{self, Mutation};
use crate::notify::{NoopNotifier, SnapshotCreated, SnapshotNotifier};
use crate::render::{self, OutputFormat, RenderedOutput};
use crate::snapshot::{
    Caller, EntityKey, EntityType, NewSnapshot, Snapshot, SnapshotSummary, VersionMeta,
};
use crate::store::{SnapshotStore, StoreError, VersionCounter};
use crate::tenant;
use crate::types::Version;

/// Default number of claim attempts before a create gives up with
/// [`CoreError::VersionConflict`].
pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u32 = 16;

/// Default page size for organisation listings.
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Largest page size an organisation listing will return.
pub const MAX_LIST_LIMIT: usize = 500;

/// Tunables for [`SnapshotEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Claim attempts per create, including the first. Values below 1 are
    /// treated as 1.
    pub max_allocation_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_allocation_attempts: DEFAULT_MAX_ALLOCATION_ATTEMPTS,
        }
    }
}

/// Immutable snapshot and versioning engine.
pub struct SnapshotEngine {
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn SnapshotNotifier>,
    config: EngineConfig,
    notification_failures: AtomicU64,
}

impl SnapshotEngine {
    /// Engine over `store` with the system clock, no notifier and default
    /// configuration.
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            notifier: Arc::new(NoopNotifier),
            config: EngineConfig::default(),
            notification_failures: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn SnapshotNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of creation notifications that failed since startup.
    pub fn notification_failures(&self) -> u64 {
        self.notification_failures.load(Ordering::Relaxed)
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Freeze `input.data` as the next version of its entity key.
    ///
    /// The checksum is computed once from the caller's payload. Each attempt
    /// reads the key's counter, proposes `current + 1` and asks the store to
    /// claim it. A lost claim is retried with a fresh read, up to
    /// [`EngineConfig::max_allocation_attempts`]. Nothing is persisted unless
    /// a claim succeeds, so no version number is ever skipped.
    pub async fn create(&self, caller: &Caller, input: NewSnapshot) -> Result<Snapshot, CoreError> {
        validate_caller(caller)?;
        input.validate()?;
        if let Some(pdf) = &input.pdf_checksum {
            if !checksum::is_hex_digest(pdf) {
                return Err(CoreError::Validation(
                    "pdf_checksum must be a 64-character lowercase hex SHA-256 digest".into(),
                ));
            }
        }

        let key = input.key();
        let data_checksum = checksum::compute_data_checksum(&input.data);
        let mut snapshot = Snapshot {
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            version: 0,
            organisation_id: caller.organisation_id.clone(),
            generated_by: caller.user_id.clone(),
            generated_at: self.clock.now(),
            data: input.data,
            data_checksum,
            checksum_algorithm: CHECKSUM_ALGORITHM.to_string(),
            pdf_checksum: input.pdf_checksum,
            is_latest: true,
            filters: input.filters,
        };

        let max_attempts = self.config.max_allocation_attempts.max(1);
        for attempt in 1..=max_attempts {
            let counter = self.store.read_counter(&key).await?;
            if let Some(counter) = &counter {
                tenant::ensure_same_organisation(caller, &key, &counter.organisation_id)?;
            }
            let expected = counter.map(|c| c.current_version);
            snapshot.version = expected.unwrap_or(0) + 1;
            snapshot.generated_at = self.clock.now();

            match self.store.claim_and_insert(expected, &snapshot).await {
                Ok(()) => {
                    tracing::info!(
                        entity_type = %key.entity_type,
                        entity_id = %key.entity_id,
                        version = snapshot.version,
                        attempt,
                        user_id = %caller.user_id,
                        data_checksum = %snapshot.data_checksum,
                        "Snapshot created"
                    );
                    self.publish_created(&snapshot).await;
                    return Ok(snapshot);
                }
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(
                        entity_type = %key.entity_type,
                        entity_id = %key.entity_id,
                        version = snapshot.version,
                        attempt,
                        "Lost version claim, retrying"
                    );
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            entity_type = %key.entity_type,
            entity_id = %key.entity_id,
            attempts = max_attempts,
            "Version allocation retries exhausted"
        );
        Err(CoreError::VersionConflict {
            entity: key.to_string(),
            attempts: max_attempts,
        })
    }

    async fn publish_created(&self, snapshot: &Snapshot) {
        let event = SnapshotCreated::from(snapshot);
        if let Err(e) = self.notifier.snapshot_created(&event).await {
            let failures = self.notification_failures.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(
                entity_type = %event.entity_type,
                entity_id = %event.entity_id,
                version = event.version,
                failures,
                error = %e,
                "Snapshot creation notification failed"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Fetch `version` of `key`, or the latest version when `None`.
    pub async fn get(
        &self,
        caller: &Caller,
        key: &EntityKey,
        version: Option<Version>,
    ) -> Result<Snapshot, CoreError> {
        match self.store.find(key, version).await? {
            Some(snapshot) => {
                tenant::ensure_same_organisation(caller, key, &snapshot.organisation_id)?;
                Ok(snapshot)
            }
            None => {
                // A missing version of another tenant's key is still denied.
                self.owned_counter(caller, key).await?;
                Err(not_found(key, version))
            }
        }
    }

    /// Like [`get`](Self::get), but fails with
    /// [`CoreError::ChecksumMismatch`] when the stored payload no longer
    /// matches its checksum. The stored record is left as it is.
    pub async fn get_verified(
        &self,
        caller: &Caller,
        key: &EntityKey,
        version: Option<Version>,
    ) -> Result<Snapshot, CoreError> {
        let snapshot = self.get(caller, key, version).await?;
        let result = checksum::verify_snapshot(&snapshot);
        if !result.valid {
            log_integrity_failure(&snapshot, &result);
            return Err(CoreError::ChecksumMismatch {
                expected: result.expected,
                actual: result.actual,
            });
        }
        Ok(snapshot)
    }

    /// Metadata for every version of `key`, ascending. Empty when the key has
    /// never been snapshotted.
    pub async fn list_versions(
        &self,
        caller: &Caller,
        key: &EntityKey,
    ) -> Result<Vec<VersionMeta>, CoreError> {
        if self.owned_counter(caller, key).await?.is_none() {
            return Ok(Vec::new());
        }
        Ok(self.store.list_versions(key).await?)
    }

    /// Latest-version summaries of every key owned by the caller's
    /// organisation, newest first.
    pub async fn list_latest(
        &self,
        caller: &Caller,
        entity_type: Option<EntityType>,
        limit: Option<usize>,
    ) -> Result<Vec<SnapshotSummary>, CoreError> {
        validate_caller(caller)?;
        let limit = limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        Ok(self
            .store
            .list_latest(&caller.organisation_id, entity_type, limit)
            .await?)
    }

    /// Recompute the checksum of a stored version and report the outcome.
    ///
    /// A mismatch is reported and logged, never corrected.
    pub async fn verify(
        &self,
        caller: &Caller,
        key: &EntityKey,
        version: Option<Version>,
    ) -> Result<ChecksumVerification, CoreError> {
        let snapshot = self.get(caller, key, version).await?;
        let result = checksum::verify_snapshot(&snapshot);
        if result.valid {
            tracing::debug!(
                entity_type = %key.entity_type,
                entity_id = %key.entity_id,
                version = snapshot.version,
                "Snapshot checksum verified"
            );
        } else {
            log_integrity_failure(&snapshot, &result);
        }
        Ok(result)
    }

    /// Render a stored version into `format` (`"json"` or `"csv"`).
    pub async fn render(
        &self,
        caller: &Caller,
        key: &EntityKey,
        version: Option<Version>,
        format: &str,
    ) -> Result<RenderedOutput, CoreError> {
        let format: OutputFormat = format.parse()?;
        let snapshot = self.get(caller, key, version).await?;
        Ok(render::render(&snapshot, format))
    }

    // -----------------------------------------------------------------------
    // Mutations (always rejected)
    // -----------------------------------------------------------------------

    /// Snapshots cannot be updated. Always fails.
    pub fn update(
        &self,
        entity_type: &str,
        entity_id: &str,
        version: Option<&str>,
    ) -> Result<(), CoreError> {
        Err(guard::reject(Mutation::Update, entity_type, entity_id, version))
    }

    /// Snapshots cannot be deleted. Always fails.
    pub fn delete(
        &self,
        entity_type: &str,
        entity_id: &str,
        version: Option<&str>,
    ) -> Result<(), CoreError> {
        Err(guard::reject(Mutation::Delete, entity_type, entity_id, version))
    }

    /// Check the backing store is reachable.
    pub async fn ping(&self) -> Result<(), CoreError> {
        Ok(self.store.ping().await?)
    }

    /// The key's counter, after checking the caller's organisation owns it.
    async fn owned_counter(
        &self,
        caller: &Caller,
        key: &EntityKey,
    ) -> Result<Option<VersionCounter>, CoreError> {
        let counter = self.store.read_counter(key).await?;
        if let Some(counter) = &counter {
            tenant::ensure_same_organisation(caller, key, &counter.organisation_id)?;
        }
        Ok(counter)
    }
}

fn validate_caller(caller: &Caller) -> Result<(), CoreError> {
    if caller.user_id.is_empty() || caller.organisation_id.is_empty() {
        return Err(CoreError::Validation(
            "caller must carry a user id and an organisation id".into(),
        ));
    }
    Ok(())
}

fn not_found(key: &EntityKey, version: Option<Version>) -> CoreError {
    let id = match version {
        Some(v) => format!("{key} version {v}"),
        None => key.to_string(),
    };
    CoreError::NotFound {
        entity: "Snapshot",
        id,
    }
}

fn log_integrity_failure(snapshot: &Snapshot, result: &ChecksumVerification) {
    tracing::error!(
        entity_type = %snapshot.entity_type,
        entity_id = %snapshot.entity_id,
        version = snapshot.version,
        expected = %result.expected,
        actual = %result.actual,
        "Snapshot checksum mismatch"
    );
}
