#![forbid(unsafe_code)]

use super::FakeClock;
use super::expirer::Expirer;
use crate::Ticker;
use flume::Receiver;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Periodic ticker driven by a [`FakeClock`].
///
/// Ticks are spaced by the period from the scheduled instant, not from when
/// the previous tick was received.
#[derive(Debug)]
pub struct FakeTicker {
    clock: FakeClock,
    expirer: Arc<Expirer>,
    receiver: Receiver<SystemTime>,
}

impl FakeTicker {
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
}

impl Ticker for FakeTicker {
    fn chan(&self) -> &Receiver<SystemTime> {
        &self.receiver
    }

    fn reset(&self, period: Duration) {
        assert!(!period.is_zero(), "non-positive interval for Ticker::reset");
        let mut state = self.clock.state.write();
        self.expirer.set_period(period);
        state.reset(&self.expirer, period);
    }

    fn stop(&self) {
        self.clock.state.write().stop(self.expirer.id());
    }
}

#[cfg(test)]
mod tests {
    use crate::{Clock, FakeClock, Ticker};
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    #[should_panic(expected = "non-positive interval for new_ticker")]
    fn zero_period_panics() {
        let clock = FakeClock::new_at(UNIX_EPOCH);
        let _ticker = clock.new_ticker(Duration::ZERO);
    }

    #[test]
    #[should_panic(expected = "non-positive interval for Ticker::reset")]
    fn reset_to_zero_panics() {
        let clock = FakeClock::new_at(UNIX_EPOCH);
        let ticker = clock.new_ticker(Duration::from_secs(1));
        ticker.reset(Duration::ZERO);
    }

    #[test]
    fn ticks_once_per_drained_period() {
        let t0 = UNIX_EPOCH;
        let period = Duration::from_secs(2);
        let clock = FakeClock::new_at(t0);
        let ticker = clock.new_ticker(period);

        for k in 1..=10u32 {
            clock.advance(period);
            assert_eq!(ticker.chan().try_recv(), Ok(t0 + period * k));
            assert!(ticker.chan().try_recv().is_err());
        }
    }

    #[test]
    fn reset_restarts_from_current_time() {
        let t0 = UNIX_EPOCH;
        let clock = FakeClock::new_at(t0);
        let ticker = clock.new_ticker(Duration::from_secs(10));

        clock.advance(Duration::from_secs(4));
        ticker.reset(Duration::from_secs(3));
        clock.advance(Duration::from_secs(3));
        assert_eq!(ticker.chan().try_recv(), Ok(t0 + Duration::from_secs(7)));

        clock.advance(Duration::from_secs(3));
        assert_eq!(ticker.chan().try_recv(), Ok(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn stopped_ticker_is_not_a_waiter() {
        let clock = FakeClock::new_at(UNIX_EPOCH);
        let ticker = clock.new_ticker(Duration::from_secs(1));
        assert_eq!(clock.waiter_count(), 1);

        ticker.stop();
        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.waiter_count(), 0);
        assert!(ticker.chan().try_recv().is_err());
    }
}
