//! Cache keys for resolved configurations
//!
//! A key is the canonical working directory plus a short content hash of the
//! request's explicit overrides. Same directory and same overrides = same key.

use crate::resolve::OverrideOptions;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Hex characters of the digest kept in the fingerprint
const FINGERPRINT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    dir: PathBuf,
    fingerprint: String,
}

impl CacheKey {
    /// `dir` must already be canonical
    pub fn new(dir: PathBuf, overrides: &OverrideOptions) -> Self {
        Self {
            dir,
            fingerprint: fingerprint(overrides),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.dir.display(), self.fingerprint)
    }
}

/// SHA256 of the serialized overrides, first 16 hex chars
fn fingerprint(overrides: &OverrideOptions) -> String {
    // non UTF-8 paths do not serialize; the debug form is just as stable
    let bytes = serde_json::to_vec(overrides).unwrap_or_else(|_| format!("{:?}", overrides).into_bytes());

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}
