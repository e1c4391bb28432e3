//! Route definitions for the `/snapshots` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::snapshots;
use crate::state::AppState;

/// Routes mounted at `/snapshots`.
///
/// ```text
/// GET    /                                        -> list_latest (?entity_type, ?limit)
/// POST   /{entity_type}/{entity_id}               -> create_snapshot
/// GET    /{entity_type}/{entity_id}               -> get_snapshot (?version, ?verify)
/// PUT    /{entity_type}/{entity_id}               -> reject_update (405)
/// PATCH  /{entity_type}/{entity_id}               -> reject_update (405)
/// DELETE /{entity_type}/{entity_id}               -> reject_delete (405)
/// GET    /{entity_type}/{entity_id}/versions      -> list_versions
/// POST   /{entity_type}/{entity_id}/verify        -> verify_snapshot (?version)
/// GET    /{entity_type}/{entity_id}/render        -> render_snapshot (?version, ?format)
/// GET    /{entity_type}/{entity_id}/{version}     -> get_snapshot_version
/// PUT    /{entity_type}/{entity_id}/{version}     -> reject_version_update (405)
/// PATCH  /{entity_type}/{entity_id}/{version}     -> reject_version_update (405)
/// DELETE /{entity_type}/{entity_id}/{version}     -> reject_version_delete (405)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(snapshots::list_latest))
        .route(
            "/{entity_type}/{entity_id}",
            post(snapshots::create_snapshot)
                .get(snapshots::get_snapshot)
                .put(snapshots::reject_update)
                .patch(snapshots::reject_update)
                .delete(snapshots::reject_delete),
        )
        .route(
            "/{entity_type}/{entity_id}/versions",
            get(snapshots::list_versions),
        )
        .route(
            "/{entity_type}/{entity_id}/verify",
            post(snapshots::verify_snapshot),
        )
        .route(
            "/{entity_type}/{entity_id}/render",
            get(snapshots::render_snapshot),
        )
        .route(
            "/{entity_type}/{entity_id}/{version}",
            get(snapshots::get_snapshot_version)
                .put(snapshots::reject_version_update)
                .patch(snapshots::reject_version_update)
                .delete(snapshots::reject_version_delete),
        )
}
