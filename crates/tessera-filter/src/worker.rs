//! Background filter worker
//!
//! One task drains a request queue strictly in arrival order and runs each
//! partition on the blocking pool. Every request carries a [`RequestId`];
//! the response is routed to that caller's own oneshot through the pending
//! map, so overlapping calls never observe each other's results.

use crate::error::FilterError;
use crate::partition::{partition_cells, FilterOutcome, DEFAULT_PARALLEL_THRESHOLD};
use crate::predicate::FilterPredicateSet;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_model::{CellTable, SegmentationMetadata};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use ulid::Ulid;

/// Correlation id of a filter request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub Ulid);

impl RequestId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Inputs of one filter pass
#[derive(Debug, Clone)]
pub struct FilterJob {
    pub cells: CellTable,
    pub metadata: Arc<SegmentationMetadata>,
    pub predicates: FilterPredicateSet,
}

impl FilterJob {
    #[must_use]
    pub fn new(
        cells: CellTable,
        metadata: Arc<SegmentationMetadata>,
        predicates: FilterPredicateSet,
    ) -> Self {
        Self {
            cells,
            metadata,
            predicates,
        }
    }
}

/// Envelope sent to the worker task
#[derive(Debug)]
pub struct FilterRequest {
    pub id: RequestId,
    pub job: FilterJob,
}

/// Worker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Requests buffered before callers wait for queue space
    pub queue_depth: usize,
    /// Table size at which partitioning switches to rayon
    pub parallel_threshold: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_depth: 64,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl WorkerConfig {
    #[must_use]
    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

type Responder = oneshot::Sender<Result<FilterOutcome, FilterError>>;
type Engine = Arc<dyn Fn(&FilterJob, usize) -> Result<FilterOutcome, FilterError> + Send + Sync>;

/// Handle to the filter worker task
pub struct FilterWorker {
    requests: mpsc::Sender<FilterRequest>,
    pending: Arc<DashMap<RequestId, Responder>>,
    terminated: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for FilterWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterWorker")
            .field("pending", &self.pending.len())
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}

impl FilterWorker {
    /// Start the worker on the current tokio runtime
    #[must_use]
    pub fn spawn(config: WorkerConfig) -> Self {
        Self::spawn_with_engine(
            config,
            Arc::new(|job: &FilterJob, threshold| {
                partition_cells(&job.cells, &job.metadata, &job.predicates, threshold)
            }),
        )
    }

    fn spawn_with_engine(config: WorkerConfig, engine: Engine) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
        let pending = Arc::new(DashMap::new());
        let task = tokio::spawn(worker_loop(
            rx,
            Arc::clone(&pending),
            engine,
            config.parallel_threshold,
        ));
        tracing::debug!(?config, "filter worker started");

        Self {
            requests: tx,
            pending,
            terminated: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
        }
    }

    /// Partition `job` on the worker
    ///
    /// # Errors
    /// - `FilterError::Partition` if the input is malformed
    /// - `FilterError::WorkerCrashed` if partitioning panicked
    /// - `FilterError::Terminated` if the worker is, or becomes, terminated
    pub async fn filter(&self, job: FilterJob) -> Result<FilterOutcome, FilterError> {
        if self.is_terminated() {
            return Err(FilterError::Terminated);
        }

        let id = RequestId::new();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        // `terminate` drains after setting the flag; re-check so a request
        // registered during the drain is not left hanging.
        if self.is_terminated() {
            self.pending.remove(&id);
            return Err(FilterError::Terminated);
        }

        tracing::trace!(%id, cells = job.cells.len(), "queueing filter request");
        if self.requests.send(FilterRequest { id, job }).await.is_err() {
            self.pending.remove(&id);
            return Err(FilterError::Terminated);
        }

        rx.await.unwrap_or(Err(FilterError::Terminated))
    }

    /// Stop the worker and reject every in-flight request
    ///
    /// A partition already running on the blocking pool finishes in the
    /// background; its result is discarded.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }

        let ids: Vec<RequestId> = self.pending.iter().map(|entry| *entry.key()).collect();
        let rejected = ids.len();
        for id in ids {
            if let Some((_, responder)) = self.pending.remove(&id) {
                let _ = responder.send(Err(FilterError::Terminated));
            }
        }
        tracing::info!(rejected, "filter worker terminated");
    }

    #[inline]
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Requests queued or running
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for FilterWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

async fn worker_loop(
    mut rx: mpsc::Receiver<FilterRequest>,
    pending: Arc<DashMap<RequestId, Responder>>,
    engine: Engine,
    parallel_threshold: usize,
) {
    while let Some(FilterRequest { id, job }) = rx.recv().await {
        if !pending.contains_key(&id) {
            tracing::trace!(%id, "caller gone, skipping request");
            continue;
        }

        let run = Arc::clone(&engine);
        let result = match tokio::task::spawn_blocking(move || run(&job, parallel_threshold)).await
        {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                let message = panic_message(err.into_panic());
                tracing::error!(%id, %message, "filter worker crashed");
                Err(FilterError::WorkerCrashed(message))
            }
            Err(_) => Err(FilterError::Terminated),
        };

        if let Err(err) = &result {
            tracing::warn!(%id, error = %err, "filter request failed");
        }
        if let Some((_, responder)) = pending.remove(&id) {
            let _ = responder.send(result);
        }
    }
    tracing::debug!("filter worker queue closed");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
