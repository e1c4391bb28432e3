//! Tenant isolation filter applied on every read path.

use crate::error::CoreError;
use crate::snapshot::{Caller, EntityKey};

/// Fail with [`CoreError::OrganisationAccess`] unless `caller` belongs to
/// `owner_organisation_id`.
///
/// The returned error carries nothing about the record; the details only go
/// to the server log.
pub fn ensure_same_organisation(
    caller: &Caller,
    key: &EntityKey,
    owner_organisation_id: &str,
) -> Result<(), CoreError> {
    if caller.organisation_id == owner_organisation_id {
        return Ok(());
    }
    tracing::warn!(
        user_id = %caller.user_id,
        caller_org = %caller.organisation_id,
        entity_type = %key.entity_type,
        entity_id = %key.entity_id,
        "Cross-organisation snapshot access denied"
    );
    Err(CoreError::OrganisationAccess)
}
