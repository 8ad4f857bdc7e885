//! Sized pool of execution slots.
//!
//! Every load and every query checks out one slot for its whole duration. The
//! slot is an owned semaphore permit, so it is returned on every exit path,
//! including cancellation and panics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::PoolError;

#[derive(Debug, Clone)]
pub struct ConnectionPool {
    semaphore: Arc<Semaphore>,
    size: usize,
    acquire_timeout: Duration,
}

/// A checked-out slot. Dropping it returns the slot to the pool.
#[derive(Debug)]
pub struct PooledConnection {
    _permit: OwnedSemaphorePermit,
    acquired_at: Instant,
}

impl PooledConnection {
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl ConnectionPool {
    pub fn new(size: usize, acquire_timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
            acquire_timeout,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits up to the acquire timeout for a free slot.
    pub async fn acquire(&self) -> Result<PooledConnection, PoolError> {
        let started = Instant::now();
        let acquire = Arc::clone(&self.semaphore).acquire_owned();

        match tokio::time::timeout(self.acquire_timeout, acquire).await {
            Ok(Ok(permit)) => Ok(PooledConnection {
                _permit: permit,
                acquired_at: Instant::now(),
            }),
            Ok(Err(_)) => Err(PoolError::Closed),
            Err(_) => {
                let waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                log::warn!(
                    "Execution pool exhausted: {} slots busy, waited {}ms",
                    self.size,
                    waited_ms
                );
                Err(PoolError::Exhausted { waited_ms })
            },
        }
    }

    /// Stops handing out slots; pending and future `acquire` calls fail.
    pub fn close(&self) {
        self.semaphore.close();
    }
}
