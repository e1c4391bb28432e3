//! Role-based access control (RBAC) extractors.
//!
//! Roles only gate who may freeze new snapshots. Reads are open to any
//! authenticated user of the owning organisation, and no role may update or
//! delete a snapshot.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sitevault_core::error::CoreError;
use sitevault_core::roles::can_create_snapshots;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires a role allowed to create snapshots (`supervisor` or `admin`).
/// Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn create(RequireSnapshotWriter(user): RequireSnapshotWriter) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireSnapshotWriter(pub AuthUser);

impl FromRequestParts<AppState> for RequireSnapshotWriter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_create_snapshots(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Supervisor or Admin role required".into(),
            )));
        }
        Ok(RequireSnapshotWriter(user))
    }
}
