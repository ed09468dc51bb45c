#![forbid(unsafe_code)]

use std::mem;
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BlockerId(u64);

/// A caller waiting for the clock to have `required` waiters.
#[derive(Debug)]
struct Blocker {
    id: BlockerId,
    required: usize,
    notify: oneshot::Sender<()>,
}

#[derive(Debug, Default)]
pub(crate) struct BlockerRegistry {
    blockers: Vec<Blocker>,
    next_id: u64,
}

impl BlockerRegistry {
    /// Registers a blocker unless `waiters` already satisfies `required`.
    pub(crate) fn register(
        &mut self,
        required: usize,
        waiters: usize,
    ) -> Option<(BlockerId, oneshot::Receiver<()>)> {
        if waiters >= required {
            return None;
        }
        let id = BlockerId(self.next_id);
        self.next_id += 1;

        let (notify, notified) = oneshot::channel();
        self.blockers.push(Blocker {
            id,
            required,
            notify,
        });
        Some((id, notified))
    }

    /// Notifies and drops every blocker satisfied by `waiters`.
    pub(crate) fn notify(&mut self, waiters: usize) {
        if self.blockers.is_empty() {
            return;
        }
        let (ready, pending): (Vec<_>, Vec<_>) = mem::take(&mut self.blockers)
            .into_iter()
            .partition(|blocker| blocker.required <= waiters);
        self.blockers = pending;

        for blocker in ready {
            debug!(id = ?blocker.id, required = blocker.required, waiters, "notifying blocker");
            // the receiver may already be gone if its wait was abandoned
            let _ = blocker.notify.send(());
        }
    }

    /// Drops a blocker whose wait ended without notification.
    pub(crate) fn remove(&mut self, id: BlockerId) -> bool {
        let before = self.blockers.len();
        self.blockers.retain(|blocker| blocker.id != id);
        before != self.blockers.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.blockers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot::error::TryRecvError;

    #[test]
    fn satisfied_threshold_needs_no_registration() {
        let mut registry = BlockerRegistry::default();

        assert!(registry.register(0, 0).is_none());
        assert!(registry.register(2, 3).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn notify_releases_only_satisfied_blockers() {
        let mut registry = BlockerRegistry::default();
        let (_, mut two) = registry.register(2, 0).unwrap();
        let (_, mut three) = registry.register(3, 0).unwrap();

        registry.notify(1);
        assert_eq!(two.try_recv(), Err(TryRecvError::Empty));

        registry.notify(2);
        assert_eq!(two.try_recv(), Ok(()));
        assert_eq!(three.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(registry.len(), 1);

        registry.notify(5);
        assert_eq!(three.try_recv(), Ok(()));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn removed_blocker_is_never_notified() {
        let mut registry = BlockerRegistry::default();
        let (id, mut notified) = registry.register(1, 0).unwrap();

        assert!(registry.remove(id));
        assert!(!registry.remove(id));

        registry.notify(1);
        assert_eq!(notified.try_recv(), Err(TryRecvError::Closed));
    }

    #[test]
    fn abandoned_receiver_does_not_break_notify() {
        let mut registry = BlockerRegistry::default();
        let (_, notified) = registry.register(1, 0).unwrap();
        drop(notified);

        registry.notify(1);
        assert_eq!(registry.len(), 0);
    }
}
