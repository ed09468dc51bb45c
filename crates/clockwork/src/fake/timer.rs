#![forbid(unsafe_code)]

use super::FakeClock;
use super::expirer::Expirer;
use crate::Timer;
use flume::Receiver;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// One-shot timer driven by a [`FakeClock`].
///
/// Dropping the handle does not cancel the timer; it stays a waiter until it
/// fires or is stopped.
#[derive(Debug)]
pub struct FakeTimer {
    clock: FakeClock,
    expirer: Arc<Expirer>,
    receiver: Receiver<SystemTime>,
}

impl FakeTimer {
    pub(crate) fn new(
        clock: FakeClock,
        expirer: Arc<Expirer>,
        receiver: Receiver<SystemTime>,
    ) -> Self {
        Self {
            clock,
            expirer,
            receiver,
        }
    }

    pub(crate) fn into_chan(self) -> Receiver<SystemTime> {
        self.receiver
    }
}

impl Timer for FakeTimer {
    fn chan(&self) -> &Receiver<SystemTime> {
        &self.receiver
    }

    fn reset(&self, duration: Duration) -> bool {
        self.clock.state.write().reset(&self.expirer, duration)
    }

    fn stop(&self) -> bool {
        self.clock.state.write().stop(self.expirer.id())
    }
}
