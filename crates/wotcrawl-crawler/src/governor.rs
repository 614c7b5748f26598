//! Fetch-slot admission and in-flight task accounting
//!
//! Two independent bounds: the semaphore caps simultaneous outbound
//! fetches, while task execution is bounded by the tokio runtime's
//! worker pool. A task waiting here suspends and yields its worker, so
//! the two limits never starve each other.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct Governor {
    fetch_slots: Arc<Semaphore>,
}

impl Governor {
    pub fn new(fetch_concurrency: usize) -> Self {
        Self {
            fetch_slots: Arc::new(Semaphore::new(fetch_concurrency)),
        }
    }

    /// Waits for a free fetch slot. The permit is held for the whole
    /// fetch, retries included, and released when dropped.
    pub async fn acquire_fetch_slot(&self) -> OwnedSemaphorePermit {
        self.fetch_slots
            .clone()
            .acquire_owned()
            .await
            .expect("fetch semaphore is never closed")
    }
}

/// Count of crawl tasks registered but not yet finished. The supervisor
/// watches this to decide quiescence. Tasks are registered before they
/// are spawned and deregistered exactly once by the guard's drop.
#[derive(Default)]
pub struct ActiveTasks {
    count: AtomicUsize,
}

impl ActiveTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(self: &Arc<Self>) -> TaskGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        TaskGuard {
            active: self.clone(),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Deregisters its task when dropped, whatever the exit path.
pub struct TaskGuard {
    active: Arc<ActiveTasks>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.active.count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn guard_deregisters_on_drop() {
        let active = Arc::new(ActiveTasks::new());
        let first = active.register();
        let second = active.register();
        assert_eq!(active.count(), 2);

        drop(first);
        assert_eq!(active.count(), 1);
        drop(second);
        assert_eq!(active.count(), 0);
    }

    #[tokio::test]
    async fn fetch_slots_are_capped() {
        let governor = Governor::new(2);
        let first = governor.acquire_fetch_slot().await;
        let _second = governor.acquire_fetch_slot().await;

        // Third acquisition must block until a slot frees up.
        let blocked =
            tokio::time::timeout(Duration::from_millis(20), governor.acquire_fetch_slot()).await;
        assert!(blocked.is_err());

        drop(first);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(20), governor.acquire_fetch_slot()).await;
        assert!(reacquired.is_ok());
    }
}
