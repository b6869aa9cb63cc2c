//! Per-location repository header: format, creation time, passphrase verifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::checksum::compute_checksum;

/// Current on-storage format version
pub const FORMAT_VERSION: u32 = 1;

/// Number of versions kept per object unless configured otherwise
pub const DEFAULT_VERSION_LIMIT: u8 = 10;

/// Key derived from a passphrase and a per-repository salt.
struct Key([u8; 32]);

impl Key {
    fn derive(passphrase: &str, salt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update([0u8]);
        hasher.update(passphrase.as_bytes());
        Self(hasher.finalize().into())
    }

    fn verifier(&self) -> String {
        let mut material = Vec::with_capacity(self.0.len() + 8);
        material.extend_from_slice(b"verifier");
        material.extend_from_slice(&self.0);
        compute_checksum(&material)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(..)")
    }
}

/// Repository header persisted by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superblock {
    pub format: u32,
    pub created: DateTime<Utc>,
    pub salt: String,
    pub verifier: String,
    pub version_limit: u8,
}

impl Superblock {
    /// Create a header for a new repository protected by `passphrase`.
    pub fn new(passphrase: &str, version_limit: u8) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let verifier = Key::derive(passphrase, &salt).verifier();
        Self {
            format: FORMAT_VERSION,
            created: Utc::now(),
            salt,
            verifier,
            version_limit: version_limit.max(1),
        }
    }

    /// Whether `passphrase` unlocks this repository.
    pub fn verify(&self, passphrase: &str) -> bool {
        Key::derive(passphrase, &self.salt).verifier() == self.verifier
    }
}
