//! SiteVault event bus and snapshot notifications.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. It implements
//!   [`SnapshotNotifier`](sitevault_core::notify::SnapshotNotifier) so the
//!   engine can publish `snapshot.created` events onto it.
//! - [`SnapshotEvent`] -- the event envelope carried on the bus.

pub mod bus;

pub use bus::{EventBus, SnapshotEvent, EVENT_SNAPSHOT_CREATED};
