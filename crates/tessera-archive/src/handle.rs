//! Caller side of a running extraction

use crate::error::ExtractError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// One extracted archive member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Normalized `/`-separated member path
    pub path: String,
    pub bytes: Vec<u8>,
}

impl ExtractedFile {
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// Final path component
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Events emitted by an extraction worker
#[derive(Debug)]
pub enum ExtractEvent {
    /// Integer percentage, emitted only when it changes
    Progress(u8),
    /// All members, in archive order
    Completed(Vec<ExtractedFile>),
    /// Terminal failure; nothing is delivered
    Failed(ExtractError),
}

impl ExtractEvent {
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Cloneable abort switch for an extraction
#[derive(Debug, Clone)]
pub struct AbortHandle {
    cancel: Arc<AtomicBool>,
    signal: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Stop the worker and release any waiter with `ExtractError::Aborted`
    pub fn abort(&self) {
        self.cancel.store(true, Ordering::Release);
        self.signal.send_replace(true);
    }

    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

/// Handle to a background extraction
///
/// Dropping the handle cancels the worker.
#[derive(Debug)]
pub struct ExtractionHandle {
    events: mpsc::Receiver<ExtractEvent>,
    abort: AbortHandle,
    aborted: watch::Receiver<bool>,
    worker: JoinHandle<()>,
    finished: bool,
}

impl ExtractionHandle {
    pub(crate) fn new(
        events: mpsc::Receiver<ExtractEvent>,
        cancel: Arc<AtomicBool>,
        worker: JoinHandle<()>,
    ) -> Self {
        let (signal, aborted) = watch::channel(false);
        Self {
            events,
            abort: AbortHandle {
                cancel,
                signal: Arc::new(signal),
            },
            aborted,
            worker,
            finished: false,
        }
    }

    /// Next event; `None` once a terminal event has been returned
    ///
    /// A worker that dies without reporting yields
    /// `Failed(ExtractError::WorkerLost)`.
    pub async fn next_event(&mut self) -> Option<ExtractEvent> {
        if self.finished {
            return None;
        }

        let event = tokio::select! {
            biased;
            _ = self.aborted.wait_for(|aborted| *aborted) => ExtractEvent::Failed(ExtractError::Aborted),
            event = self.events.recv() => match event {
                Some(event) => event,
                None if self.abort.is_aborted() => ExtractEvent::Failed(ExtractError::Aborted),
                None => ExtractEvent::Failed(ExtractError::WorkerLost),
            },
        };

        if event.is_terminal() {
            self.finished = true;
        }
        Some(event)
    }

    /// Drive the extraction to completion, forwarding progress
    ///
    /// # Errors
    /// Returns the worker's terminal error, `ExtractError::Aborted` after
    /// [`abort`](Self::abort), or `ExtractError::WorkerLost`
    pub async fn wait_with_progress(
        mut self,
        mut on_progress: impl FnMut(u8),
    ) -> Result<Vec<ExtractedFile>, ExtractError> {
        while let Some(event) = self.next_event().await {
            match event {
                ExtractEvent::Progress(percent) => on_progress(percent),
                ExtractEvent::Completed(files) => return Ok(files),
                ExtractEvent::Failed(err) => return Err(err),
            }
        }
        Err(ExtractError::WorkerLost)
    }

    /// Drive the extraction to completion, ignoring progress
    ///
    /// # Errors
    /// See [`wait_with_progress`](Self::wait_with_progress)
    pub async fn wait(self) -> Result<Vec<ExtractedFile>, ExtractError> {
        self.wait_with_progress(|_| {}).await
    }

    /// Hard-stop the worker
    #[inline]
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Abort switch usable from other tasks
    #[inline]
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Whether the worker thread has exited
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

impl Drop for ExtractionHandle {
    fn drop(&mut self) {
        self.abort.cancel.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_with(events: Vec<ExtractEvent>) -> ExtractionHandle {
        let (tx, rx) = mpsc::channel(16);
        for event in events {
            tx.try_send(event).unwrap();
        }
        drop(tx);
        let worker = tokio::spawn(async {});
        ExtractionHandle::new(rx, Arc::new(AtomicBool::new(false)), worker)
    }

    #[tokio::test]
    async fn wait_collects_progress_then_files() {
        let handle = handle_with(vec![
            ExtractEvent::Progress(40),
            ExtractEvent::Progress(100),
            ExtractEvent::Completed(vec![ExtractedFile::new("a/b.bin", vec![1])]),
        ]);

        let mut seen = Vec::new();
        let files = handle.wait_with_progress(|p| seen.push(p)).await.unwrap();
        assert_eq!(seen, vec![40, 100]);
        assert_eq!(files[0].file_name(), "b.bin");
    }

    #[tokio::test]
    async fn closed_channel_reports_worker_lost() {
        let handle = handle_with(vec![ExtractEvent::Progress(10)]);
        assert!(matches!(handle.wait().await, Err(ExtractError::WorkerLost)));
    }

    #[tokio::test]
    async fn abort_releases_waiter() {
        let (_tx, rx) = mpsc::channel(1);
        let worker = tokio::spawn(async {});
        let handle = ExtractionHandle::new(rx, Arc::new(AtomicBool::new(false)), worker);

        let abort = handle.abort_handle();
        let waiter = tokio::spawn(handle.wait());
        abort.abort();

        assert!(matches!(waiter.await.unwrap(), Err(ExtractError::Aborted)));
    }

    #[tokio::test]
    async fn no_events_after_terminal() {
        let mut handle = handle_with(vec![ExtractEvent::Failed(ExtractError::Aborted)]);
        assert!(handle.next_event().await.is_some());
        assert!(handle.next_event().await.is_none());
    }
}
