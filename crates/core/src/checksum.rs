//! Payload checksums and integrity verification.
//!
//! `data_checksum` is the lowercase hex SHA-256 of the canonical
//! serialization of a snapshot's `data` (see [`crate::canonical`]).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical;
use crate::snapshot::Snapshot;

/// Name of the hash recorded alongside every checksum.
pub const CHECKSUM_ALGORITHM: &str = "sha256";

/// Length of a hex-encoded SHA-256 digest.
pub const HEX_DIGEST_LEN: usize = 64;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Checksum of a payload under the canonical serialization rules.
pub fn compute_data_checksum(data: &serde_json::Value) -> String {
    sha256_hex(&canonical::to_canonical_bytes(data))
}

/// Whether `s` looks like a lowercase hex SHA-256 digest.
pub fn is_hex_digest(s: &str) -> bool {
    s.len() == HEX_DIGEST_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Outcome of recomputing a stored snapshot's checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumVerification {
    pub valid: bool,
    /// The checksum stored at creation time.
    pub expected: String,
    /// The checksum recomputed from the stored `data` now.
    pub actual: String,
    pub algorithm: String,
}

/// Recompute `snapshot`'s checksum and compare it with the stored one.
///
/// Pure: never alters the snapshot, whatever the outcome.
pub fn verify_snapshot(snapshot: &Snapshot) -> ChecksumVerification {
    let actual = compute_data_checksum(&snapshot.data);
    ChecksumVerification {
        valid: actual == snapshot.data_checksum,
        expected: snapshot.data_checksum.clone(),
        actual,
        algorithm: CHECKSUM_ALGORITHM.to_string(),
    }
}
