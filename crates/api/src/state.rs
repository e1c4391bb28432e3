use std::sync::Arc;

use sitevault_core::engine::SnapshotEngine;
use sitevault_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The snapshot engine, wired to the configured store and the event bus.
    pub engine: Arc<SnapshotEngine>,
    /// Server configuration (JWT settings are read by the auth extractor).
    pub config: Arc<ServerConfig>,
    /// Event bus the engine publishes `snapshot.created` events onto.
    pub event_bus: Arc<EventBus>,
}
