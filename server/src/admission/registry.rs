//! Lazily populated map of admission controllers keyed by scope.

use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use super::AdmissionController;

/// One [`AdmissionController`] per scope, created on first use.
///
/// Every controller shares the capacity and release delay given at
/// construction. Entries are never evicted: a scope keeps its controller for
/// the lifetime of the registry.
#[derive(Debug)]
pub struct ScopedRegistry<S>
where
    S: Eq + Hash,
{
    controllers: DashMap<S, AdmissionController>,
    capacity: usize,
    release_delay: Duration,
}

impl<S> ScopedRegistry<S>
where
    S: Eq + Hash + Clone,
{
    /// Create an empty registry.
    pub fn new(capacity: usize, release_delay: Duration) -> Self {
        Self {
            controllers: DashMap::new(),
            capacity,
            release_delay,
        }
    }

    /// Get the controller for `scope`, creating it if this scope is new.
    ///
    /// Equal scopes always resolve to the same controller.
    pub fn controller_for(&self, scope: &S) -> AdmissionController {
        // Fast path: scope already known
        if let Some(controller) = self.controllers.get(scope) {
            return controller.clone();
        }

        self.controllers
            .entry(scope.clone())
            .or_insert_with(|| {
                debug!(
                    capacity = self.capacity,
                    release_delay_ms = self.release_delay.as_millis() as u64,
                    "Allocating admission controller for new scope"
                );
                AdmissionController::with_release_delay(self.capacity, self.release_delay)
            })
            .clone()
    }

    /// Number of scopes seen so far.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn release_delay(&self) -> Duration {
        self.release_delay
    }
}
