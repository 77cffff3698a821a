//! Error types for archive extraction

use std::io;

/// Extraction failures
///
/// Every variant is terminal: partial results are discarded.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// File extension is not an accepted source kind
    #[error("unsupported file extension: '{0}'")]
    UnsupportedExtension(String),

    /// Source could not be read
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Tar stream is malformed
    #[error("tar decode failed: {0}")]
    Tar(io::Error),

    /// Zip container is malformed
    #[error("zip decode failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Member exceeds the configured size limit
    #[error("member '{path}' is {size} bytes (limit {limit})")]
    MemberTooLarge { path: String, size: u64, limit: u64 },

    /// Extraction was aborted by the caller
    #[error("extraction aborted")]
    Aborted,

    /// Worker stopped without reporting a result
    #[error("extraction worker exited unexpectedly")]
    WorkerLost,
}

impl ExtractError {
    /// Whether the caller asked for this outcome
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
