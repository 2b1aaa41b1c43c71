//! Content fingerprints for uploaded feature files.

use sha2::{Digest, Sha256};

/// SHA-256 of `content`, as 64 lowercase hex characters.
///
/// Used to detect re-uploads of an unchanged file.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
