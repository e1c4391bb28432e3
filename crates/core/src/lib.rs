//! SiteVault core: the immutable snapshot and versioning engine.
//!
//! Everything that decides what a snapshot *is* lives here with no knowledge
//! of HTTP or PostgreSQL:
//!
//! - [`snapshot`] -- entity keys, snapshot records, version metadata.
//! - [`canonical`] / [`checksum`] -- canonical serialization and SHA-256 digests.
//! - [`render`] -- deterministic projections of a frozen payload.
//! - [`guard`] / [`tenant`] -- immutability and organisation isolation policies.
//! - [`store`] -- the [`store::SnapshotStore`] seam plus an in-memory backend.
//! - [`engine`] -- [`engine::SnapshotEngine`], the operations exposed to workflows.

pub mod canonical;
pub mod checksum;
pub mod clock;
pub mod conformance;
pub mod engine;
pub mod error;
pub mod guard;
pub mod notify;
pub mod render;
pub mod roles;
pub mod snapshot;
pub mod store;
pub mod tenant;
pub mod types;
