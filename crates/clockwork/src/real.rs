#![forbid(unsafe_code)]

//! Clock backed by the system time and Tokio timers.
//!
//! Timers and tickers run as Tokio tasks, so creating one outside a Tokio
//! runtime panics the same way [`tokio::spawn`] does.

use crate::{Callback, Clock, Ticker, Timer};
use educe::Educe;
use flume::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

#[derive(Debug, Default, Clone, Copy)]
pub struct RealClock;

#[async_trait::async_trait]
impl Clock for RealClock {
    fn after(&self, duration: Duration) -> Receiver<SystemTime> {
        // the task outlives the handle, only the channel is needed
        RealTimer::new(duration, None).receiver.clone()
    }

    async fn sleep(&self, duration: Duration) {
        time::sleep(duration).await;
    }

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn new_ticker(&self, period: Duration) -> Box<dyn Ticker> {
        assert!(!period.is_zero(), "non-positive interval for new_ticker");
        Box::new(RealTicker::new(period))
    }

    fn new_timer(&self, duration: Duration) -> Box<dyn Timer> {
        Box::new(RealTimer::new(duration, None))
    }

    fn after_func(&self, duration: Duration, callback: Callback) -> Box<dyn Timer> {
        Box::new(RealTimer::new(duration, Some(Arc::from(callback))))
    }
}

/// Stops a pending task, returning whether it had not finished yet.
fn disarm(task: Option<JoinHandle<()>>) -> bool {
    task.is_some_and(|task| {
        let pending = !task.is_finished();
        task.abort();
        pending
    })
}

#[derive(Educe)]
#[educe(Debug)]
pub(crate) struct RealTimer {
    sender: Sender<SystemTime>,
    receiver: Receiver<SystemTime>,
    #[educe(Debug(ignore))]
    callback: Option<Arc<dyn Fn() + Send + Sync>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealTimer {
    fn new(duration: Duration, callback: Option<Arc<dyn Fn() + Send + Sync>>) -> Self {
        let (sender, receiver) = flume::bounded(1);
        let timer = Self {
            sender,
            receiver,
            callback,
            task: Mutex::new(None),
        };
        *timer.task.lock() = Some(timer.spawn(duration));
        timer
    }

    fn spawn(&self, duration: Duration) -> JoinHandle<()> {
        let sender = self.sender.clone();
        let callback = self.callback.clone();
        tokio::spawn(async move {
            time::sleep(duration).await;
            match callback {
                Some(callback) => {
                    tokio::task::spawn_blocking(move || callback());
                }
                None => {
                    if sender.try_send(SystemTime::now()).is_err() {
                        trace!("timer receiver is full or gone, dropping expiration");
                    }
                }
            }
        })
    }
}

impl Timer for RealTimer {
    fn chan(&self) -> &Receiver<SystemTime> {
        &self.receiver
    }

    fn reset(&self, duration: Duration) -> bool {
        let mut task = self.task.lock();
        let pending = disarm(task.take());
        *task = Some(self.spawn(duration));
        pending
    }

    fn stop(&self) -> bool {
        disarm(self.task.lock().take())
    }
}

/// Ticker driven by [`tokio::time::Interval`]. Dropping it stops the ticks.
#[derive(Debug)]
pub(crate) struct RealTicker {
    sender: Sender<SystemTime>,
    receiver: Receiver<SystemTime>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealTicker {
    fn new(period: Duration) -> Self {
        let (sender, receiver) = flume::bounded(1);
        let task = Self::spawn(sender.clone(), period);
        Self {
            sender,
            receiver,
            task: Mutex::new(Some(task)),
        }
    }

    fn spawn(sender: Sender<SystemTime>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.try_send(SystemTime::now()).is_err() {
                    trace!("ticker receiver is full, dropping tick");
                }
            }
        })
    }
}

impl Ticker for RealTicker {
    fn chan(&self) -> &Receiver<SystemTime> {
        &self.receiver
    }

    fn reset(&self, period: Duration) {
        assert!(!period.is_zero(), "non-positive interval for Ticker::reset");
        let mut task = self.task.lock();
        disarm(task.take());
        *task = Some(Self::spawn(self.sender.clone(), period));
    }

    fn stop(&self) {
        disarm(self.task.lock().take());
    }
}

impl Drop for RealTicker {
    fn drop(&mut self) {
        disarm(self.task.get_mut().take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn timer_fires_after_duration() {
        let clock = RealClock;
        let timer = clock.new_timer(Duration::from_millis(50));

        let fired = timer.chan().recv_async().await;

        assert!(fired.is_ok());
        assert!(timer.chan().try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_timer_reports_pending() {
        let clock = RealClock;
        let timer = clock.new_timer(Duration::from_secs(60));

        assert!(timer.stop());
        assert!(!timer.stop());
        time::sleep(Duration::from_secs(120)).await;
        assert!(timer.chan().try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_keeps_ticking_until_stopped() {
        let clock = RealClock;
        let ticker = clock.new_ticker(Duration::from_millis(10));

        for _ in 0..3 {
            assert!(ticker.chan().recv_async().await.is_ok());
        }
        ticker.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn after_func_runs_callback() {
        let clock = RealClock;
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let (done_tx, done_rx) = flume::bounded(1);

        let _timer = clock.after_func(
            Duration::from_millis(5),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = done_tx.try_send(());
            }),
        );

        done_rx.recv_async().await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "non-positive interval for new_ticker")]
    fn zero_period_panics() {
        let _ticker = RealClock.new_ticker(Duration::ZERO);
    }
}
