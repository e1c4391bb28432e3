//! Immutability guard.
//!
//! Snapshots are write-once. Every update or delete attempt, from any caller
//! and any role, ends here and fails with
//! [`CoreError::ImmutabilityViolation`]. The target is taken as the raw path
//! segments: nothing is parsed, authenticated or looked up first, so the
//! outcome cannot depend on whether the target exists or is even well formed.

use crate::error::CoreError;

/// The kinds of mutation callers may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Update,
    Delete,
}

impl Mutation {
    fn past_participle(self) -> &'static str {
        match self {
            Mutation::Update => "updated",
            Mutation::Delete => "deleted",
        }
    }
}

/// Reject `mutation` against the named target (optionally a specific `version`).
pub fn reject(
    mutation: Mutation,
    entity_type: &str,
    entity_id: &str,
    version: Option<&str>,
) -> CoreError {
    tracing::warn!(
        entity_type,
        entity_id,
        version,
        mutation = ?mutation,
        "Rejected mutation of immutable snapshot"
    );
    CoreError::ImmutabilityViolation {
        action: mutation.past_participle(),
    }
}
