//! Extraction entry point

use crate::error::ExtractError;
use crate::format::ArchiveFormat;
use crate::handle::ExtractionHandle;
use crate::worker::{self, WorkerContext};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Extraction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Reject members larger than this many bytes
    pub max_member_bytes: Option<u64>,
    /// Bound of the worker's event channel
    pub channel_capacity: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_member_bytes: None,
            channel_capacity: 128,
        }
    }
}

impl ExtractOptions {
    /// Set the per-member size limit
    #[inline]
    #[must_use]
    pub fn with_max_member_bytes(mut self, limit: u64) -> Self {
        self.max_member_bytes = Some(limit);
        self
    }
}

/// Starts archive extractions on blocking worker threads
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor {
    options: ExtractOptions,
}

impl ArchiveExtractor {
    #[inline]
    #[must_use]
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract `source` of `total_size` bytes in the background
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<R>(&self, source: R, total_size: u64, format: ArchiveFormat) -> ExtractionHandle
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.options.channel_capacity.max(1));
        let cancel = Arc::new(AtomicBool::new(false));

        let ctx = WorkerContext {
            events: tx,
            cancel: Arc::clone(&cancel),
            max_member_bytes: self.options.max_member_bytes,
        };

        let worker = tokio::task::spawn_blocking(move || {
            worker::run(Box::new(source), total_size, format, &ctx);
        });

        ExtractionHandle::new(rx, cancel, worker)
    }

    /// Extract an archive file, taking format from its extension
    ///
    /// # Errors
    /// - `ExtractError::UnsupportedExtension` if the path is not `.tar`/`.zip`
    /// - `ExtractError::Io` if the file cannot be opened
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<ExtractionHandle, ExtractError> {
        let path = path.as_ref();
        let format = ArchiveFormat::from_path(path)?;

        let file = tokio::fs::File::open(path).await?;
        let total_size = file.metadata().await?.len();
        let file = file.into_std().await;

        tracing::debug!(path = %path.display(), %format, total_size, "opening archive");
        Ok(self.spawn(file, total_size, format))
    }
}
