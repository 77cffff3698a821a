//! Error types for cell filtering

/// Failure of a filter request
///
/// A failed request never yields a partial partition; the caller retries
/// or gives up on the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// Partitioning hit malformed input
    #[error("error filtering cells: {0}")]
    Partition(String),

    /// Worker was terminated before answering
    #[error("filter worker terminated")]
    Terminated,

    /// Worker panicked while processing the request
    #[error("filter worker crashed: {0}")]
    WorkerCrashed(String),

    /// A newer request replaced this one
    #[error("filter request superseded by a newer one")]
    Superseded,
}

impl FilterError {
    /// Filtering is pure, so the same inputs may be resubmitted
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Partition(_) | Self::WorkerCrashed(_))
    }

    /// Result was discarded rather than failed
    #[inline]
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}
