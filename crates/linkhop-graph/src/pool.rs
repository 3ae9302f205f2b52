//! Bounded session checkout shared by all graph sources.
//!
//! A sampling call holds exactly one [`SessionPermit`] for its duration.
//! The permit is returned when dropped, so release happens on success,
//! early return, error, and cancellation alike. Waiting for a permit is
//! bounded by the acquire timeout; there is no unbounded queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::client::GraphError;

/// Fixed-capacity pool of session slots.
#[derive(Debug, Clone)]
pub struct SessionPool {
    permits: Arc<Semaphore>,
    capacity: usize,
    acquire_timeout: Duration,
}

/// One checked-out session slot.
#[derive(Debug)]
pub struct SessionPermit {
    _permit: OwnedSemaphorePermit,
}

impl SessionPool {
    pub fn new(capacity: usize, acquire_timeout: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            acquire_timeout,
        }
    }

    /// Wait (bounded) for a free slot.
    pub async fn checkout(&self) -> Result<SessionPermit, GraphError> {
        let acquire = self.permits.clone().acquire_owned();
        match tokio::time::timeout(self.acquire_timeout, acquire).await {
            Ok(Ok(permit)) => Ok(SessionPermit { _permit: permit }),
            Ok(Err(_)) => Err(GraphError::PoolClosed),
            Err(_) => {
                let waited_ms = self.acquire_timeout.as_millis() as u64;
                tracing::warn!(
                    capacity = self.capacity,
                    waited_ms,
                    "Session pool exhausted"
                );
                Err(GraphError::PoolExhausted { waited_ms })
            }
        }
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Refuse all future checkouts. Outstanding permits stay valid.
    pub fn close(&self) {
        self.permits.close();
    }
}
