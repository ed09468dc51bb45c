#![forbid(unsafe_code)]

use super::expirer::{Expirer, ExpirerId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Debug)]
pub(crate) struct Waiter {
    pub(crate) at: SystemTime,
    pub(crate) expirer: Arc<Expirer>,
}

/// Pending expirers, ordered by expiration instant.
///
/// Entries with the same instant keep their insertion order.
#[derive(Debug, Default)]
pub(crate) struct WaiterQueue {
    waiters: VecDeque<Waiter>,
}

impl WaiterQueue {
    pub(crate) fn insert(&mut self, expirer: Arc<Expirer>, at: SystemTime) {
        // first entry strictly after `at`, so equal instants stay FIFO
        let idx = self.waiters.partition_point(|waiter| waiter.at <= at);
        self.waiters.insert(idx, Waiter { at, expirer });
    }

    /// Removes the expirer, returning whether it was pending.
    pub(crate) fn remove(&mut self, id: ExpirerId) -> bool {
        match self
            .waiters
            .iter()
            .position(|waiter| waiter.expirer.id() == id)
        {
            Some(idx) => {
                self.waiters.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Pops the earliest waiter if it expires at or before `target`.
    pub(crate) fn pop_due(&mut self, target: SystemTime) -> Option<Waiter> {
        if self.waiters.front()?.at <= target {
            self.waiters.pop_front()
        } else {
            None
        }
    }

    pub(crate) fn next_expiration(&self) -> Option<SystemTime> {
        self.waiters.front().map(|waiter| waiter.at)
    }

    #[cfg(test)]
    fn contains(&self, id: ExpirerId) -> bool {
        self.waiters.iter().any(|waiter| waiter.expirer.id() == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }

    #[cfg(test)]
    fn ids(&self) -> Vec<ExpirerId> {
        self.waiters.iter().map(|waiter| waiter.expirer.id()).collect()
    }
}
