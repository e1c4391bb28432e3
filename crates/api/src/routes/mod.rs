pub mod health;
pub mod snapshots;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /snapshots                                          list latest per organisation
/// /snapshots/{entity_type}/{entity_id}                create, get; update/delete rejected
/// /snapshots/{entity_type}/{entity_id}/versions       version history
/// /snapshots/{entity_type}/{entity_id}/verify         checksum verification
/// /snapshots/{entity_type}/{entity_id}/render         json / csv projection
/// /snapshots/{entity_type}/{entity_id}/{version}      get; update/delete rejected
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/snapshots", snapshots::router())
}
