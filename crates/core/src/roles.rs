//! Well-known role name constants carried in access tokens.
//!
//! Roles never widen what may be done to a snapshot: the immutability guard
//! rejects mutations for every role, admins included.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPERVISOR: &str = "supervisor";
pub const ROLE_OTHER: &str = "other";

/// Roles allowed to freeze an entity into a new snapshot.
pub const SNAPSHOT_WRITER_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_SUPERVISOR];

/// Whether `role` may create snapshots. Comparison is case-insensitive.
pub fn can_create_snapshots(role: &str) -> bool {
    SNAPSHOT_WRITER_ROLES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(role))
}
