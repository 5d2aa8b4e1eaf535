//! Secret Derivation
//!
//! ```text
//! ["ballpen-item", "", "Ballpen Item"]
//!        │ compact (drop empty)
//!        ▼
//! ["ballpen-item","Ballpen Item"]   ← canonical JSON
//!        │ sha512
//!        ▼
//! 33cf3db6...ff28c92c               ← SECRET (128 hex chars)
//! ```

use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use crate::{Error, Result};

/// Length of a secret in bytes
pub const SECRET_LEN: usize = 64;

/// The derived secret - exists only for the length of one call
///
/// Held as the lowercase hex digest. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    hex: String,
}

impl Zeroize for Secret {
    fn zeroize(&mut self) {
        self.hex.zeroize();
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Secret {
    /// Wrap raw digest bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SECRET_LEN {
            return Err(Error::CombineFailed(format!(
                "secret must be {} bytes, got {}",
                SECRET_LEN,
                bytes.len()
            )));
        }

        Ok(Self { hex: hex::encode(bytes) })
    }

    /// Hex digest
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// Raw digest bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        // Only ever built from bytes or a digest, so always valid hex.
        hex::decode(&self.hex).unwrap_or_default()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

/// Drop empty factors, keeping order
pub fn compact<S: AsRef<str>>(factor: &[S]) -> Vec<&str> {
    factor
        .iter()
        .map(AsRef::as_ref)
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Derive the secret for a factor list
///
/// The compacted list is serialized as a JSON array of strings before
/// hashing, so `["a", "b"]` and `["ab"]` never share a secret.
pub fn derive_secret<S: AsRef<str>>(factor: &[S]) -> Result<Secret> {
    let compacted = compact(factor);
    if compacted.is_empty() {
        return Err(Error::MissingFactor);
    }

    let canonical = serde_json::to_string(&compacted)
        .map_err(|e| Error::InvalidFactor(e.to_string()))?;

    let digest = Sha512::digest(canonical.as_bytes());
    Secret::from_bytes(&digest)
}
