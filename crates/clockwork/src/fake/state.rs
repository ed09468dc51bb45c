#![forbid(unsafe_code)]

use super::blocker::{BlockerId, BlockerRegistry};
use super::expirer::{Expirer, ExpirerId};
use super::queue::WaiterQueue;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Stand-in deadline for durations that overflow `SystemTime`, roughly 30
/// years out.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline(now: SystemTime, duration: Duration) -> SystemTime {
    now.checked_add(duration)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Everything a fake clock mutates, kept behind one lock.
#[derive(Debug)]
pub(crate) struct ClockState {
    now: SystemTime,
    waiters: WaiterQueue,
    blockers: BlockerRegistry,
    next_expirer_id: u64,
}

impl ClockState {
    pub(crate) fn new(now: SystemTime) -> Self {
        Self {
            now,
            waiters: WaiterQueue::default(),
            blockers: BlockerRegistry::default(),
            next_expirer_id: 0,
        }
    }

    pub(crate) fn now(&self) -> SystemTime {
        self.now
    }

    pub(crate) fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    pub(crate) fn next_expirer_id(&mut self) -> ExpirerId {
        let id = ExpirerId::new(self.next_expirer_id);
        self.next_expirer_id += 1;
        id
    }

    /// Schedules `expirer` to fire `duration` from now.
    ///
    /// A zero duration fires immediately and never enters the queue. Tickers
    /// never get here with a zero duration, they reject it up front.
    pub(crate) fn schedule(&mut self, expirer: Arc<Expirer>, duration: Duration) {
        if duration.is_zero() {
            trace!(id = ?expirer.id(), now = ?self.now, "firing immediately");
            let _ = expirer.fire(self.now);
            return;
        }

        let at = deadline(self.now, duration);
        trace!(id = ?expirer.id(), ?at, "scheduling");
        self.waiters.insert(expirer, at);
        self.blockers.notify(self.waiters.len());
    }

    /// Like [`ClockState::schedule`] but for an absolute instant.
    pub(crate) fn schedule_at(&mut self, expirer: Arc<Expirer>, at: SystemTime) {
        let duration = at.duration_since(self.now).unwrap_or_default();
        self.schedule(expirer, duration);
    }

    /// Removes the expirer from the queue, returning whether it was pending.
    pub(crate) fn stop(&mut self, id: ExpirerId) -> bool {
        self.waiters.remove(id)
    }

    /// Stops and re-schedules the expirer, returning whether it was pending.
    pub(crate) fn reset(&mut self, expirer: &Arc<Expirer>, duration: Duration) -> bool {
        let was_pending = self.stop(expirer.id());
        self.schedule(Arc::clone(expirer), duration);
        was_pending
    }

    /// Moves virtual time forward by `duration`, firing everything that
    /// expires on the way.
    ///
    /// Each waiter fires with the clock set to its own expiration instant,
    /// and recurring waiters re-enter the queue before the next one is
    /// picked. Time always ends exactly at the target.
    pub(crate) fn advance(&mut self, duration: Duration) {
        let target = deadline(self.now, duration);
        let mut fired = 0usize;

        while let Some(waiter) = self.waiters.pop_due(target) {
            self.now = waiter.at;
            fired += 1;
            trace!(id = ?waiter.expirer.id(), now = ?self.now, "expiring");
            if let Some(period) = waiter.expirer.fire(self.now) {
                self.schedule(waiter.expirer, period);
            }
        }
        self.now = target;

        debug!(
            now = ?self.now,
            fired,
            waiters = self.waiters.len(),
            next = ?self.waiters.next_expiration(),
            "advanced"
        );
    }

    /// Registers a blocker for `required` waiters, or returns `None` when
    /// the clock already has that many.
    pub(crate) fn register_blocker(
        &mut self,
        required: usize,
    ) -> Option<(BlockerId, oneshot::Receiver<()>)> {
        let registration = self.blockers.register(required, self.waiters.len());
        if registration.is_some() {
            debug!(
                required,
                waiters = self.waiters.len(),
                blockers = self.blockers.len(),
                "registered blocker"
            );
        }
        registration
    }

    #[cfg(test)]
    pub(crate) fn blocker_count(&self) -> usize {
        self.blockers.len()
    }

    pub(crate) fn remove_blocker(&mut self, id: BlockerId) {
        if self.blockers.remove(id) {
            debug!(?id, "removed unsatisfied blocker");
        }
    }
}
