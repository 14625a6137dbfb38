//! Bounded-concurrency admission queue
//!
//! At most `limit` submitted futures execute at once. Further submissions
//! wait in FIFO order on a fair semaphore. The backlog is unbounded unless
//! `max_waiting` is set, in which case submissions beyond it are rejected.

use crate::error::PipelineError;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub limit: usize,
    pub executing: usize,
    pub waiting: usize,
    pub max_waiting: Option<usize>,
}

impl QueueStats {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "limit": self.limit,
            "executing": self.executing,
            "waiting": self.waiting,
            "max_waiting": self.max_waiting,
        })
    }
}

#[derive(Debug)]
pub struct AdmissionQueue {
    limit: usize,
    max_waiting: Option<usize>,
    slots: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    executing: Arc<AtomicUsize>,
}

impl AdmissionQueue {
    pub fn new(limit: usize, max_waiting: Option<usize>) -> Self {
        log::info!(
            "Initializing admission queue: limit={}, max_waiting={:?}",
            limit,
            max_waiting
        );
        Self {
            limit,
            max_waiting,
            slots: Arc::new(Semaphore::new(limit)),
            waiting: Arc::new(AtomicUsize::new(0)),
            executing: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Waits for an admission slot, then runs `job` to completion on its own
    /// task. Once admitted the job is not cancelled, even if the caller stops
    /// waiting for the result. The slot is freed when the job finishes.
    pub async fn submit<F, T>(&self, job: F) -> Result<T, PipelineError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = {
            let _waiting = self.enter_backlog()?;
            self.slots
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| PipelineError::Internal("admission queue closed".to_string()))?
        };

        self.executing.fetch_add(1, Ordering::SeqCst);
        let executing = self.executing.clone();
        let handle = tokio::spawn(async move {
            let _slot = SlotGuard {
                executing,
                _permit: permit,
            };
            job.await
        });

        handle.await.map_err(|e| {
            if e.is_panic() {
                PipelineError::Internal("job panicked".to_string())
            } else {
                PipelineError::Internal(format!("job aborted: {}", e))
            }
        })
    }

    fn enter_backlog(&self) -> Result<BacklogGuard, PipelineError> {
        let waiting = self.waiting.fetch_add(1, Ordering::SeqCst);
        let guard = BacklogGuard {
            waiting: self.waiting.clone(),
        };
        if let Some(max) = self.max_waiting {
            // a free slot means the job will not actually wait
            if waiting >= max && self.slots.available_permits() == 0 {
                return Err(PipelineError::QueueFull { waiting });
            }
        }
        Ok(guard)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn executing(&self) -> usize {
        self.executing.load(Ordering::SeqCst)
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            limit: self.limit,
            executing: self.executing(),
            waiting: self.waiting(),
            max_waiting: self.max_waiting,
        }
    }
}

struct BacklogGuard {
    waiting: Arc<AtomicUsize>,
}

impl Drop for BacklogGuard {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SlotGuard {
    executing: Arc<AtomicUsize>,
    _permit: tokio::sync::OwnedSemaphorePermit,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let count = self.executing.fetch_sub(1, Ordering::SeqCst) - 1;
        log::debug!("Admission slot released, executing: {}", count);
    }
}
