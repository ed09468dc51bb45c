#![forbid(unsafe_code)]

use educe::Educe;
use flume::{Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{trace, warn};

/// Stable handle identifying an expirer inside a single fake clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ExpirerId(u64);

impl ExpirerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

#[derive(Educe)]
#[educe(Debug)]
pub(crate) enum ExpirerKind {
    /// Fires once. With a callback, firing runs the callback on its own
    /// thread instead of sending on the channel.
    OneShot {
        #[educe(Debug(ignore))]
        callback: Option<Arc<dyn Fn() + Send + Sync>>,
    },
    /// Fires every `period`, measured from the scheduled instant.
    Recurring { period: Mutex<Duration> },
}

/// A timer or ticker that expires at some point in virtual time.
#[derive(Debug)]
pub(crate) struct Expirer {
    id: ExpirerId,
    sender: Sender<SystemTime>,
    kind: ExpirerKind,
}

impl Expirer {
    pub(crate) fn new(id: ExpirerId, sender: Sender<SystemTime>, kind: ExpirerKind) -> Self {
        Self { id, sender, kind }
    }

    pub(crate) fn id(&self) -> ExpirerId {
        self.id
    }

    /// Updates the period of a recurring expirer. No-op for one-shot ones.
    pub(crate) fn set_period(&self, period: Duration) {
        if let ExpirerKind::Recurring { period: current } = &self.kind {
            *current.lock() = period;
        }
    }

    /// Expires at `now`, returning the delay until the next expiration, if
    /// any. Never blocks.
    pub(crate) fn fire(&self, now: SystemTime) -> Option<Duration> {
        match &self.kind {
            ExpirerKind::OneShot {
                callback: Some(callback),
            } => {
                self.spawn_callback(Arc::clone(callback));
                None
            }
            ExpirerKind::OneShot { callback: None } => {
                self.deliver(now);
                None
            }
            ExpirerKind::Recurring { period } => {
                self.deliver(now);
                Some(*period.lock())
            }
        }
    }

    fn deliver(&self, now: SystemTime) {
        match self.sender.try_send(now) {
            Ok(()) => trace!(id = ?self.id, ?now, "delivered expiration"),
            Err(TrySendError::Full(_)) => {
                trace!(id = ?self.id, ?now, "receiver has a pending value, dropping expiration")
            }
            Err(TrySendError::Disconnected(_)) => {
                trace!(id = ?self.id, "receiver is gone, dropping expiration")
            }
        }
    }

    fn spawn_callback(&self, callback: Arc<dyn Fn() + Send + Sync>) {
        let spawned = thread::Builder::new()
            .name("clockwork-after-func".into())
            .spawn(move || callback());
        if let Err(err) = spawned {
            warn!(id = ?self.id, error = %err, "failed to spawn after_func callback");
        }
    }
}
