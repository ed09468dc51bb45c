#![forbid(unsafe_code)]

//! A clock that only moves when told to.
//!
//! [`FakeClock`] keeps a list of *waiters*: every pending timer and ticker,
//! including the ones behind [`Clock::after`] and [`Clock::sleep`]. Tests
//! move time with [`FakeClock::advance`] and can wait for code under test to
//! register its timers with [`FakeClock::block_until`].

mod blocker;
mod expirer;
mod queue;
mod state;
mod ticker;
mod timer;

use crate::{Callback, Clock, Error, Ticker, Timer};
use blocker::BlockerId;
use expirer::{Expirer, ExpirerKind};
use flume::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use state::ClockState;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use ticker::FakeTicker;
pub use timer::FakeTimer;

/// A manually advanced clock for tests.
///
/// Cloning is cheap and every clone shares the same virtual time.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Arc<RwLock<ClockState>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    /// Creates a fake clock starting at the current system time.
    ///
    /// Tests that need a deterministic start should use
    /// [`FakeClock::new_at`].
    pub fn new() -> Self {
        Self::new_at(SystemTime::now())
    }

    pub fn new_at(start: SystemTime) -> Self {
        Self {
            state: Arc::new(RwLock::new(ClockState::new(start))),
        }
    }

    /// Moves the clock forward by `duration`, firing every waiter that
    /// expires on the way before returning.
    pub fn advance(&self, duration: Duration) {
        let span = tracing::debug_span!("advance", ?duration);
        let _enter = span.enter();
        self.state.write().advance(duration);
    }

    /// Number of pending timers and tickers.
    pub fn waiter_count(&self) -> usize {
        self.state.read().waiter_count()
    }

    /// Like [`Clock::new_timer`] but fires at an absolute instant. An instant
    /// that is not in the future fires right away.
    pub fn new_timer_at(&self, at: SystemTime) -> FakeTimer {
        let (sender, receiver) = flume::bounded(1);
        let expirer = {
            let mut state = self.state.write();
            let expirer = Arc::new(Expirer::new(
                state.next_expirer_id(),
                sender,
                ExpirerKind::OneShot { callback: None },
            ));
            state.schedule_at(Arc::clone(&expirer), at);
            expirer
        };
        FakeTimer::new(self.clone(), expirer, receiver)
    }

    /// Like [`Clock::after`] but fires at an absolute instant.
    pub fn after_at(&self, at: SystemTime) -> Receiver<SystemTime> {
        self.new_timer_at(at).into_chan()
    }

    /// Like [`Clock::after`], sending on `registered` once the timer is
    /// counted as a waiter.
    pub fn after_notify(
        &self,
        duration: Duration,
        registered: oneshot::Sender<()>,
    ) -> Receiver<SystemTime> {
        let chan = self.fake_timer(duration, None).into_chan();
        let _ = registered.send(());
        chan
    }

    /// Like [`Clock::sleep`], sending on `registered` once the sleep is
    /// counted as a waiter.
    pub async fn sleep_notify(&self, duration: Duration, registered: oneshot::Sender<()>) {
        let chan = self.after_notify(duration, registered);
        let _ = chan.recv_async().await;
    }

    /// Waits until the clock has at least `required` waiters.
    ///
    /// Hangs forever if they never show up; prefer
    /// [`FakeClock::block_until_cancellable`] in code that can time out.
    pub async fn block_until(&self, required: usize) {
        let _ = self
            .block_until_cancellable(&CancellationToken::new(), required)
            .await;
    }

    /// Waits until the clock has at least `required` waiters or `token` is
    /// cancelled.
    pub async fn block_until_cancellable(
        &self,
        token: &CancellationToken,
        required: usize,
    ) -> Result<(), Error> {
        let (registered, _) = oneshot::channel();
        self.block_until_notify(token, required, registered).await
    }

    /// Like [`FakeClock::block_until_cancellable`], sending on `registered`
    /// once the wait is recorded by the clock.
    pub async fn block_until_notify(
        &self,
        token: &CancellationToken,
        required: usize,
        registered: oneshot::Sender<()>,
    ) -> Result<(), Error> {
        let registration = self.state.write().register_blocker(required);
        let _ = registered.send(());

        let Some((id, notified)) = registration else {
            return Ok(());
        };
        let _pending = PendingBlocker {
            clock: self.clone(),
            id,
        };

        tokio::select! {
            biased;
            // the sender lives in the clock until `_pending` removes it
            Ok(()) = notified => Ok(()),
            () = token.cancelled() => {
                debug!(required, "wait for waiters cancelled");
                Err(Error::Cancelled { required })
            }
        }
    }

    fn fake_timer(
        &self,
        duration: Duration,
        callback: Option<Arc<dyn Fn() + Send + Sync>>,
    ) -> FakeTimer {
        let (sender, receiver) = flume::bounded(1);
        let expirer = self.register(sender, ExpirerKind::OneShot { callback }, duration);
        FakeTimer::new(self.clone(), expirer, receiver)
    }

    fn register(
        &self,
        sender: Sender<SystemTime>,
        kind: ExpirerKind,
        duration: Duration,
    ) -> Arc<Expirer> {
        let mut state = self.state.write();
        let expirer = Arc::new(Expirer::new(state.next_expirer_id(), sender, kind));
        state.schedule(Arc::clone(&expirer), duration);
        expirer
    }
}

/// Removes an unsatisfied blocker once its wait is over, so cancelled or
/// dropped waits leave nothing behind in the clock.
struct PendingBlocker {
    clock: FakeClock,
    id: BlockerId,
}

impl Drop for PendingBlocker {
    fn drop(&mut self) {
        self.clock.state.write().remove_blocker(self.id);
    }
}

#[async_trait::async_trait]
impl Clock for FakeClock {
    fn after(&self, duration: Duration) -> Receiver<SystemTime> {
        self.fake_timer(duration, None).into_chan()
    }

    async fn sleep(&self, duration: Duration) {
        let chan = self.after(duration);
        let _ = chan.recv_async().await;
    }

    fn now(&self) -> SystemTime {
        self.state.read().now()
    }

    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker> {
        assert!(!period.is_zero(), "non-positive interval for new_ticker");
        let (sender, receiver) = flume::bounded(1);
        let kind = ExpirerKind::Recurring {
            period: Mutex::new(period),
        };
        let expirer = self.register(sender, kind, period);
        Box::new(FakeTicker::new(self.clone(), expirer, receiver))
    }

    fn new_timer(&self, duration: Duration) -> Box<dyn Timer> {
        Box::new(self.fake_timer(duration, None))
    }

    fn after_func(&self, duration: Duration, callback: Callback) -> Box<dyn Timer> {
        Box::new(self.fake_timer(duration, Some(Arc::from(callback))))
    }
}
