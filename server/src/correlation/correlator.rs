//! Time-bounded rendezvous between a collector and its children.
//!
//! Each correlation id owns at most one pending record, created by whichever
//! side touches it first. Children append themselves to the record and wait
//! for a bounded time to be claimed. The collector repeatedly drains the
//! record, then waits for either a new child or the timeout.
//!
//! Every record lookup or mutation happens under the map's shard lock and
//! finishes before the caller suspends, so the second side to arrive always
//! sees the record created by the first.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

/// How a child registration was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// The collector absorbed the child; nothing else should be emitted for it.
    Merged,
    /// Nobody claimed the child in time; it must be handled on its own.
    Independent,
}

/// A child waiting to be claimed.
struct PendingChild<C> {
    child_id: C,
    ticket: u64,
    resolve: oneshot::Sender<()>,
}

/// Shared state for one correlation id.
struct PendingRecord<C> {
    /// Children in registration order.
    children: Vec<PendingChild<C>>,
    /// Wake slot of the collector's current wait, if any.
    wake: Option<oneshot::Sender<()>>,
    /// Set while a collector owns this record.
    collecting: bool,
}

impl<C> Default for PendingRecord<C> {
    fn default() -> Self {
        Self {
            children: Vec::new(),
            wake: None,
            collecting: false,
        }
    }
}

/// Rendezvous point between parent events and their children.
pub struct Correlator<K, C>
where
    K: Eq + Hash,
{
    records: DashMap<K, PendingRecord<C>>,
    timeout: Duration,
    next_ticket: AtomicU64,
}

impl<K, C> fmt::Debug for Correlator<K, C>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.records.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<K, C> Correlator<K, C>
where
    K: Eq + Hash + Clone + fmt::Debug,
    C: fmt::Debug,
{
    /// Create a correlator whose waits are each bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            records: DashMap::new(),
            timeout,
            next_ticket: AtomicU64::new(0),
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a pending record exists for `correlation_id`.
    pub fn is_pending(&self, correlation_id: &K) -> bool {
        self.records.contains_key(correlation_id)
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Register a child and wait for a collector to claim it.
    ///
    /// Returns [`ChildOutcome::Merged`] if a collector drained the child
    /// before the timeout, [`ChildOutcome::Independent`] otherwise. A child
    /// the collector counted always sees `Merged`, even when its own timer
    /// fires at the same moment.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn register_child(&self, correlation_id: K, child_id: C) -> ChildOutcome {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let mut resolved = {
            let (resolve, resolved) = oneshot::channel();
            let mut record = self.records.entry(correlation_id.clone()).or_default();
            record.children.push(PendingChild {
                child_id,
                ticket,
                resolve,
            });
            if let Some(wake) = record.wake.take() {
                let _ = wake.send(());
            }
            resolved
        };

        let mut guard = WithdrawOnDrop {
            correlator: self,
            correlation_id: &correlation_id,
            ticket,
            armed: true,
        };

        let outcome = match tokio::time::timeout(self.timeout, &mut resolved).await {
            Ok(Ok(())) => ChildOutcome::Merged,
            // The record was torn down without draining us.
            Ok(Err(_)) => ChildOutcome::Independent,
            Err(_) => {
                if self.withdraw(&correlation_id, ticket) {
                    ChildOutcome::Independent
                } else if resolved.try_recv().is_ok() {
                    // Drained between the timer firing and the withdrawal.
                    ChildOutcome::Merged
                } else {
                    ChildOutcome::Independent
                }
            }
        };
        guard.armed = false;

        debug!(?outcome, "Child registration resolved");
        outcome
    }

    /// Claim every child of `correlation_id`, including ones that keep
    /// arriving while this call waits, and return how many were claimed.
    ///
    /// Each wait lasts at most the configured timeout, so a childless collect
    /// returns zero after exactly one timeout. The pending record is removed
    /// before returning.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn collect(&self, correlation_id: K) -> usize {
        {
            let mut record = self.records.entry(correlation_id.clone()).or_default();
            if record.collecting {
                warn!("Another collector already owns this record, skipping");
                return 0;
            }
            record.collecting = true;
        }

        let mut guard = RemoveOnDrop {
            records: &self.records,
            correlation_id: &correlation_id,
            armed: true,
        };

        let mut merged = 0;
        loop {
            let wake = {
                let Some(mut record) = self.records.get_mut(&correlation_id) else {
                    break;
                };
                for child in record.children.drain(..) {
                    if child.resolve.send(()).is_ok() {
                        merged += 1;
                        trace!(child_id = ?child.child_id, "Child merged");
                    }
                }
                let (wake, woken) = oneshot::channel();
                record.wake = Some(wake);
                woken
            };

            let woken = matches!(tokio::time::timeout(self.timeout, wake).await, Ok(Ok(())));

            // Deciding to stop and deleting the record must be one step, or a
            // child could slip into a record nobody will drain.
            let finished = self
                .records
                .remove_if(&correlation_id, |_, record| {
                    !woken && record.children.is_empty()
                })
                .is_some();
            if finished {
                break;
            }
        }
        guard.armed = false;

        debug!(merged, "Collection finished");
        merged
    }

    /// Remove the child holding `ticket` and drop the record if nothing else
    /// needs it. Returns whether the child was still pending.
    fn withdraw(&self, correlation_id: &K, ticket: u64) -> bool {
        let withdrawn = self
            .records
            .get_mut(correlation_id)
            .is_some_and(|mut record| {
                let before = record.children.len();
                record.children.retain(|child| child.ticket != ticket);
                record.children.len() != before
            });

        self.records.remove_if(correlation_id, |_, record| {
            !record.collecting && record.children.is_empty()
        });

        withdrawn
    }
}

/// Withdraws a child whose registration future was dropped mid-wait.
struct WithdrawOnDrop<'a, K, C>
where
    K: Eq + Hash + Clone + fmt::Debug,
    C: fmt::Debug,
{
    correlator: &'a Correlator<K, C>,
    correlation_id: &'a K,
    ticket: u64,
    armed: bool,
}

impl<K, C> Drop for WithdrawOnDrop<'_, K, C>
where
    K: Eq + Hash + Clone + fmt::Debug,
    C: fmt::Debug,
{
    fn drop(&mut self) {
        if self.armed {
            self.correlator.withdraw(self.correlation_id, self.ticket);
        }
    }
}

/// Deletes the record of a collector that was dropped mid-wait. Pending
/// children then resolve as independent.
struct RemoveOnDrop<'a, K, C>
where
    K: Eq + Hash,
{
    records: &'a DashMap<K, PendingRecord<C>>,
    correlation_id: &'a K,
    armed: bool,
}

impl<K, C> Drop for RemoveOnDrop<'_, K, C>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        if self.armed {
            self.records.remove(self.correlation_id);
        }
    }
}
