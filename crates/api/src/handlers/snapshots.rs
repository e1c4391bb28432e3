//! Handlers for the `/snapshots` resource.
//!
//! Read and create handlers resolve the caller from the access token and
//! delegate to the [`SnapshotEngine`](sitevault_core::engine::SnapshotEngine),
//! which enforces organisation isolation. Mutation handlers go straight to the
//! immutability guard with the raw path segments.

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use sitevault_core::checksum::ChecksumVerification;
use sitevault_core::snapshot::{
    EntityKey, EntityType, NewSnapshot, Snapshot, SnapshotReceipt, SnapshotSummary, VersionMeta,
};
use sitevault_core::types::Version;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireSnapshotWriter;
use crate::query::{ListParams, RenderParams, SnapshotQuery, VersionParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default render format when `?format=` is omitted.
const DEFAULT_RENDER_FORMAT: &str = "json";

/// Request body for creating a snapshot. The entity key comes from the path.
#[derive(Debug, Deserialize)]
pub struct CreateSnapshotRequest {
    pub data: serde_json::Value,
    #[serde(default)]
    pub filters: Option<serde_json::Value>,
    #[serde(default)]
    pub pdf_checksum: Option<String>,
}

fn entity_key(entity_type: &str, entity_id: String) -> AppResult<EntityKey> {
    Ok(EntityKey::new(EntityType::from_name(entity_type)?, entity_id))
}

/// Versions start at 1; anything lower is a malformed request, not a miss.
fn requested_version(version: Option<Version>) -> AppResult<Option<Version>> {
    match version {
        Some(v) if v < 1 => Err(AppError::BadRequest(format!(
            "version must be at least 1, got {v}"
        ))),
        other => Ok(other),
    }
}

/// POST /api/v1/snapshots/{entity_type}/{entity_id}
///
/// Freeze the submitted payload as the entity's next version. Returns 201
/// with the allocated version and checksum.
pub async fn create_snapshot(
    State(state): State<AppState>,
    RequireSnapshotWriter(user): RequireSnapshotWriter,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Json(body): Json<CreateSnapshotRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SnapshotReceipt>>)> {
    let key = entity_key(&entity_type, entity_id)?;
    let input = NewSnapshot {
        entity_type: key.entity_type,
        entity_id: key.entity_id,
        data: body.data,
        filters: body.filters,
        pdf_checksum: body.pdf_checksum,
    };

    let snapshot = state.engine.create(&user.caller(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SnapshotReceipt::from(&snapshot),
        }),
    ))
}

/// GET /api/v1/snapshots
///
/// Latest-version summaries of every entity owned by the caller's
/// organisation, newest first.
pub async fn list_latest(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<SnapshotSummary>>>> {
    let entity_type = params
        .entity_type
        .as_deref()
        .map(EntityType::from_name)
        .transpose()?;
    let summaries = state
        .engine
        .list_latest(&user.caller(), entity_type, params.limit)
        .await?;
    Ok(Json(DataResponse { data: summaries }))
}

/// GET /api/v1/snapshots/{entity_type}/{entity_id}
///
/// The latest version, or `?version=N`. With `?verify=true` a payload that
/// fails its checksum is reported as 409 instead of being returned.
pub async fn get_snapshot(
    State(state): State<AppState>,
    user: AuthUser,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(params): Query<SnapshotQuery>,
) -> AppResult<Json<DataResponse<Snapshot>>> {
    let key = entity_key(&entity_type, entity_id)?;
    let version = requested_version(params.version)?;
    let caller = user.caller();
    let snapshot = if params.verify {
        state.engine.get_verified(&caller, &key, version).await?
    } else {
        state.engine.get(&caller, &key, version).await?
    };
    Ok(Json(DataResponse { data: snapshot }))
}

/// GET /api/v1/snapshots/{entity_type}/{entity_id}/{version}
pub async fn get_snapshot_version(
    State(state): State<AppState>,
    user: AuthUser,
    Path((entity_type, entity_id, version)): Path<(String, String, Version)>,
) -> AppResult<Json<DataResponse<Snapshot>>> {
    let key = entity_key(&entity_type, entity_id)?;
    let version = requested_version(Some(version))?;
    let snapshot = state.engine.get(&user.caller(), &key, version).await?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// GET /api/v1/snapshots/{entity_type}/{entity_id}/versions
///
/// Version metadata, oldest first.
pub async fn list_versions(
    State(state): State<AppState>,
    user: AuthUser,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Vec<VersionMeta>>>> {
    let key = entity_key(&entity_type, entity_id)?;
    let versions = state.engine.list_versions(&user.caller(), &key).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /api/v1/snapshots/{entity_type}/{entity_id}/verify
///
/// Recompute the stored checksum. A mismatch is reported with `valid:
/// false`, not as an error.
pub async fn verify_snapshot(
    State(state): State<AppState>,
    user: AuthUser,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(params): Query<VersionParams>,
) -> AppResult<Json<DataResponse<ChecksumVerification>>> {
    let key = entity_key(&entity_type, entity_id)?;
    let version = requested_version(params.version)?;
    let result = state.engine.verify(&user.caller(), &key, version).await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/snapshots/{entity_type}/{entity_id}/render
///
/// Project a stored version into `?format=json|csv`. The body is the raw
/// projection, labelled with its content type.
pub async fn render_snapshot(
    State(state): State<AppState>,
    user: AuthUser,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Query(params): Query<RenderParams>,
) -> AppResult<Response> {
    let key = entity_key(&entity_type, entity_id)?;
    let version = requested_version(params.version)?;
    let format = params.format.as_deref().unwrap_or(DEFAULT_RENDER_FORMAT);
    let rendered = state
        .engine
        .render(&user.caller(), &key, version, format)
        .await?;
    Ok(([(CONTENT_TYPE, rendered.content_type)], rendered.bytes).into_response())
}

/// PUT|PATCH /api/v1/snapshots/{entity_type}/{entity_id}
///
/// Always 405: snapshots are immutable. Runs before authentication and
/// before the entity type is parsed.
pub async fn reject_update(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state.engine.update(&entity_type, &entity_id, None)?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/snapshots/{entity_type}/{entity_id}
///
/// Always 405: snapshots are immutable.
pub async fn reject_delete(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state.engine.delete(&entity_type, &entity_id, None)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT|PATCH /api/v1/snapshots/{entity_type}/{entity_id}/{version}
///
/// The version segment is passed through unparsed.
pub async fn reject_version_update(
    State(state): State<AppState>,
    Path((entity_type, entity_id, version)): Path<(String, String, String)>,
) -> AppResult<StatusCode> {
    state.engine.update(&entity_type, &entity_id, Some(&version))?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/snapshots/{entity_type}/{entity_id}/{version}
pub async fn reject_version_delete(
    State(state): State<AppState>,
    Path((entity_type, entity_id, version)): Path<(String, String, String)>,
) -> AppResult<StatusCode> {
    state.engine.delete(&entity_type, &entity_id, Some(&version))?;
    Ok(StatusCode::NO_CONTENT)
}
