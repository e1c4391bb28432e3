/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Snapshot version numbers. Stored as PostgreSQL BIGINT, always >= 1.
pub type Version = i64;
