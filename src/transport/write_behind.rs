//! Write-behind pool for cache writes.
//!
//! # Responsibilities
//! - Accept cache writes without blocking the request path
//! - Run them on a fixed set of worker tasks
//! - Bound pending work with a queue; drop writes when it is full
//!
//! # Design Decisions
//! - Workers share one receiver; whichever is idle takes the next job
//! - Write errors are logged here and go nowhere else

use std::sync::Arc;

use axum::http::Response;
use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use crate::cache::{CacheRequest, CacheStore};
use crate::observability::metrics;

/// A response waiting to be stored.
pub struct WriteJob {
    pub request: CacheRequest,
    pub response: Response<Bytes>,
}

/// Outcome of [`WriteBehind::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Queued,
    /// The queue was full or the workers are gone; the write was dropped.
    Dropped,
}

/// Handle to the write-behind worker pool.
#[derive(Clone)]
pub struct WriteBehind {
    tx: mpsc::Sender<WriteJob>,
}

impl WriteBehind {
    /// Spawn `workers` tasks draining a queue of `capacity` pending writes.
    pub fn spawn<S: CacheStore>(store: Arc<S>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        for worker in 0..workers.max(1) {
            let store = Arc::clone(&store);
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                run_worker(worker, store, rx).await;
            });
        }

        tracing::debug!(workers, capacity, "Cache write pool started");
        Self { tx }
    }

    /// Hand a write to the pool. Never waits.
    pub fn submit(&self, job: WriteJob) -> Submitted {
        match self.tx.try_send(job) {
            Ok(()) => Submitted::Queued,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(url = %job.request.uri, "Cache write queue full, dropping write");
                metrics::record_write_dropped();
                Submitted::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(url = %job.request.uri, "Cache write pool stopped, dropping write");
                metrics::record_write_dropped();
                Submitted::Dropped
            }
        }
    }
}

async fn run_worker<S: CacheStore>(
    worker: usize,
    store: Arc<S>,
    rx: Arc<Mutex<mpsc::Receiver<WriteJob>>>,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            tracing::trace!(worker, "Cache write worker exiting");
            break;
        };

        if let Err(e) = store.set(&job.request, &job.response).await {
            tracing::warn!(worker, url = %job.request.uri, error = %e, "Unable to update cache");
            metrics::record_cache_error("set");
        } else {
            tracing::trace!(worker, url = %job.request.uri, "Cache updated");
        }
    }
}
