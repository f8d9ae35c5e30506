//! Row identity: deterministic digest of all field values of a record.
//!
//! The digest is a deduplication key used to exclude vetoed and
//! always-include individuals from the candidate pool. It is not a security
//! token. BLAKE3 keeps it stable across runs, builds and platforms.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 32-byte BLAKE3 digest of a record's canonical field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowDigest([u8; 32]);

impl RowDigest {
    /// Digest of field values in the given order.
    ///
    /// Each field is length-prefixed, so `["a-b", "c"]` and `["a", "b-c"]`
    /// produce different digests.
    pub fn of_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut hasher = blake3::Hasher::new();
        for field in fields {
            let bytes = field.as_ref().as_bytes();
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for RowDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
