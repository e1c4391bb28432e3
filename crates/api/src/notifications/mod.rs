//! Notification routing infrastructure.
//!
//! The [`NotificationRouter`] subscribes to the event bus and raises admin
//! notifications for submitted DPR snapshots.

pub mod router;

pub use router::{AdminNotification, NotificationRouter};
