//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sitevault_core::error::CoreError;
use sitevault_core::snapshot::Caller;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %user.user_id, org = %user.organisation_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's id (from `claims.sub`).
    pub user_id: String,
    /// The organisation the user acts for (from `claims.org`).
    pub organisation_id: String,
    /// The user's role name (e.g. `"admin"`, `"supervisor"`).
    pub role: String,
}

impl AuthUser {
    /// The engine-level identity of this user.
    pub fn caller(&self) -> Caller {
        Caller::new(&self.user_id, &self.organisation_id, &self.role)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        if claims.sub.is_empty() || claims.org.is_empty() {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Token is missing user or organisation".into(),
            )));
        }

        Ok(AuthUser {
            user_id: claims.sub,
            organisation_id: claims.org,
            role: claims.role,
        })
    }
}
