//! Repository layer: one struct per table family, static async fns over
//! `&PgPool` or a transaction connection.

pub mod snapshot_repo;

pub use snapshot_repo::SnapshotRepo;
