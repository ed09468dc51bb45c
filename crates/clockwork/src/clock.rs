#![forbid(unsafe_code)]

use flume::Receiver;
use std::fmt::Debug;
use std::time::{Duration, SystemTime};

/// Function run by a timer created with [`Clock::after_func`].
///
/// A timer can be reset after it fired, so the callback may run more than
/// once.
pub type Callback = Box<dyn Fn() + Send + Sync + 'static>;

/// Source of time that can be swapped for a [`FakeClock`](crate::FakeClock)
/// in tests.
///
/// Every channel handed out by a clock has room for exactly one value. When a
/// value is already waiting, newer expirations are dropped instead of
/// blocking the clock.
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    /// Returns a channel that receives the current time once `duration` has
    /// elapsed on this clock.
    fn after(&self, duration: Duration) -> Receiver<SystemTime>;

    /// Waits until `duration` has elapsed on this clock.
    async fn sleep(&self, duration: Duration);

    fn now(&self) -> SystemTime;

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    fn since(&self, earlier: SystemTime) -> Duration {
        self.now().duration_since(earlier).unwrap_or_default()
    }

    /// Time left until `later`, or zero if `later` already passed.
    fn until(&self, later: SystemTime) -> Duration {
        later.duration_since(self.now()).unwrap_or_default()
    }

    /// Creates a ticker delivering the time every `period`.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker>;

    fn new_timer(&self, duration: Duration) -> Box<dyn Timer>;

    /// Creates a timer that runs `callback` on its own thread or task instead
    /// of sending on its channel.
    fn after_func(&self, duration: Duration, callback: Callback) -> Box<dyn Timer>;
}

/// One-shot timer handed out by a [`Clock`].
pub trait Timer: Debug + Send + Sync {
    fn chan(&self) -> &Receiver<SystemTime>;

    /// Re-arms the timer to fire after `duration`. Returns whether the timer
    /// was still pending.
    fn reset(&self, duration: Duration) -> bool;

    /// Returns whether the timer was still pending. Stopping does not drain
    /// the channel.
    fn stop(&self) -> bool;
}

/// Periodic ticker handed out by a [`Clock`].
pub trait Ticker: Debug + Send + Sync {
    fn chan(&self) -> &Receiver<SystemTime>;

    /// Changes the period and restarts the ticker from the current time.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    fn reset(&self, period: Duration);

    fn stop(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FakeClock;
    use std::sync::Arc;
    use std::time::UNIX_EPOCH;

    /// Retries with a fixed delay, the kind of code the trait exists for.
    async fn retry_with_delay(clock: &dyn Clock, attempts: usize, delay: Duration) -> SystemTime {
        for _ in 1..attempts {
            clock.sleep(delay).await;
        }
        clock.now()
    }

    #[test]
    fn since_and_until_saturate_at_zero() {
        let t0 = UNIX_EPOCH + Duration::from_secs(100);
        let clock = FakeClock::new_at(t0);

        assert_eq!(clock.since(t0 - Duration::from_secs(3)), Duration::from_secs(3));
        assert_eq!(clock.since(t0 + Duration::from_secs(3)), Duration::ZERO);
        assert_eq!(clock.until(t0 + Duration::from_secs(7)), Duration::from_secs(7));
        assert_eq!(clock.until(t0 - Duration::from_secs(7)), Duration::ZERO);
    }

    #[tokio::test]
    async fn injected_fake_clock_drives_retry_loop() {
        let t0 = UNIX_EPOCH;
        let clock = FakeClock::new_at(t0);
        let injected: Arc<dyn Clock> = Arc::new(clock.clone());

        let task = tokio::spawn(async move {
            retry_with_delay(injected.as_ref(), 3, Duration::from_secs(2)).await
        });

        for _ in 0..2 {
            clock.block_until(1).await;
            clock.advance(Duration::from_secs(2));
        }

        let finished_at = task.await.unwrap();
        assert_eq!(finished_at, t0 + Duration::from_secs(4));
    }
}
