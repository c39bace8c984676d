//! Per-scope admission controller.
//!
//! Slots are handed out by a `tokio::sync::Semaphore`, which queues waiters in
//! arrival order and transfers a released permit straight to the oldest
//! waiter. A slot is held by an [`AdmissionSlot`] guard; dropping the guard
//! releases the slot, either immediately or after the configured delay.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};

/// Concurrency gate for a single scope.
///
/// Cloning is cheap and every clone shares the same slots.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    release_delay: Duration,
}

impl AdmissionController {
    /// Create a controller that frees slots as soon as an operation finishes.
    pub fn new(capacity: usize) -> Self {
        Self::with_release_delay(capacity, Duration::ZERO)
    }

    /// Create a controller that keeps a finished operation's slot occupied
    /// for `release_delay` before the next caller may claim it.
    ///
    /// A capacity of zero would never admit anything and is raised to one.
    /// Capacities above [`Semaphore::MAX_PERMITS`] are lowered to it.
    pub fn with_release_delay(capacity: usize, release_delay: Duration) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            release_delay,
        }
    }

    /// Maximum number of concurrently held slots.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cool-down applied after an operation completes.
    pub const fn release_delay(&self) -> Duration {
        self.release_delay
    }

    /// Number of slots currently held, including slots still cooling down.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Wait for a free slot.
    ///
    /// Callers are admitted strictly in the order they started waiting. A
    /// caller whose future is dropped while queued gives up its place without
    /// consuming a slot.
    pub async fn acquire(&self) -> AdmissionSlot {
        if self.semaphore.available_permits() == 0 {
            debug!(
                capacity = self.capacity,
                "Scope at capacity, queueing for a slot"
            );
        }

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("admission semaphore is never closed");

        trace!(in_flight = self.in_flight(), "Slot acquired");

        AdmissionSlot {
            permit: Some(permit),
            release_delay: self.release_delay,
        }
    }

    /// Run `operation` while holding a slot.
    ///
    /// The slot is released once the operation's future completes, whatever
    /// its output. Errors are returned to the caller untouched.
    pub async fn run<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _slot = self.acquire().await;
        operation().await
    }
}

/// A held admission slot.
///
/// Dropping the slot returns it to the controller. With a release delay the
/// permit is parked in a timer task first, so nobody can claim it until the
/// delay has elapsed.
#[derive(Debug)]
pub struct AdmissionSlot {
    permit: Option<OwnedSemaphorePermit>,
    release_delay: Duration,
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };

        if self.release_delay.is_zero() {
            drop(permit);
            return;
        }

        // Outside a runtime there is no timer to park the permit on.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let delay = self.release_delay;
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    drop(permit);
                });
            }
            Err(_) => drop(permit),
        }
    }
}
