//! Last-call-wins gate for overlapping filter requests

use crate::error::FilterError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generation number handed out by [`LatestRequest::begin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Discards results of requests that a newer one has replaced
#[derive(Debug, Default)]
pub struct LatestRequest {
    generation: AtomicU64,
}

impl LatestRequest {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request, superseding all earlier ones
    pub fn begin(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` belongs to the newest request
    #[inline]
    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }

    /// Pass `result` through, or replace it with `Superseded` if stale
    ///
    /// # Errors
    /// - `FilterError::Superseded` if a newer request has begun
    /// - any error already in `result`
    pub fn settle<T>(&self, ticket: Ticket, result: Result<T, FilterError>) -> Result<T, FilterError> {
        if self.is_current(ticket) {
            result
        } else {
            tracing::trace!(?ticket, "discarding stale filter result");
            Err(FilterError::Superseded)
        }
    }

    /// Run `request` under a fresh ticket
    ///
    /// # Errors
    /// As [`LatestRequest::settle`].
    pub async fn run<T, F>(&self, request: F) -> Result<T, FilterError>
    where
        F: Future<Output = Result<T, FilterError>>,
    {
        let ticket = self.begin();
        let result = request.await;
        self.settle(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_results_are_superseded() {
        let gate = LatestRequest::new();
        let first = gate.begin();
        let second = gate.begin();

        assert!(!gate.is_current(first));
        assert_eq!(gate.settle(first, Ok(1)), Err(FilterError::Superseded));
        assert_eq!(gate.settle(second, Ok(2)), Ok(2));
    }

    #[tokio::test]
    async fn newer_run_wins() {
        let gate = LatestRequest::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let slow = gate.run(async {
            let _ = rx.await;
            Ok::<_, FilterError>("slow")
        });
        let fast = async {
            let out = gate.run(async { Ok::<_, FilterError>("fast") }).await;
            let _ = tx.send(());
            out
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert_eq!(fast, Ok("fast"));
        assert_eq!(slow, Err(FilterError::Superseded));
    }
}
