//! Dataset fingerprints
//!
//! Provides [`DatasetFingerprint`], a Blake3 digest over an archive's member
//! paths and contents. Caches key decoded tiles by fingerprint so a reload
//! never serves tiles from the previous dataset.

use std::fmt::{self, Display, Formatter};

/// 32-byte Blake3 digest identifying a loaded dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DatasetFingerprint([u8; 32]);

impl DatasetFingerprint {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Fingerprint of a single byte payload
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for DatasetFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Incremental fingerprint over `(path, bytes)` members
///
/// Member order matters: extraction order is part of the dataset identity.
#[derive(Debug, Default)]
pub struct FingerprintBuilder {
    hasher: blake3::Hasher,
}

impl FingerprintBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one member
    pub fn member(&mut self, path: &str, data: &[u8]) -> &mut Self {
        self.hasher.update(&(path.len() as u64).to_le_bytes());
        self.hasher.update(path.as_bytes());
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
        self
    }

    #[must_use]
    pub fn finish(&self) -> DatasetFingerprint {
        DatasetFingerprint(*self.hasher.finalize().as_bytes())
    }
}
