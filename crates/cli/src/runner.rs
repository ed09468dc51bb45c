#![forbid(unsafe_code)]

use crate::Error;
use clockwork::{Clock, FakeClock, Ticker, Timer};
use config::Config;
use flume::Receiver;
use std::io::Write;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// A registered timer or ticker.
enum Source {
    Timer(Box<dyn Timer>),
    Ticker(Box<dyn Ticker>),
}

impl Source {
    fn chan(&self) -> &Receiver<SystemTime> {
        match self {
            Source::Timer(timer) => timer.chan(),
            Source::Ticker(ticker) => ticker.chan(),
        }
    }
}

/// One expiration observed while replaying a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    /// Step during which the expiration was observed, `0` for expirations
    /// that happened while registering.
    pub step: usize,
    pub name: String,
    /// Offset from the start of the scenario.
    pub offset: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub firings: Vec<Firing>,
    /// Offset of the clock after the last step.
    pub elapsed: Duration,
    /// Timers and tickers still pending at the end.
    pub pending: usize,
}

impl Report {
    /// Writes one tab-separated line per firing followed by a summary line.
    pub fn write_to(&self, mut out: impl Write) -> Result<(), Error> {
        for firing in &self.firings {
            writeln!(
                out,
                "{}\t{}\t{}ms",
                firing.step,
                firing.name,
                firing.offset.as_millis()
            )
            .map_err(Error::Output)?;
        }
        writeln!(
            out,
            "# elapsed {}ms, {} pending",
            self.elapsed.as_millis(),
            self.pending
        )
        .map_err(Error::Output)
    }
}

/// Replays `config` on a fresh fake clock, followed by `extra_steps`.
///
/// Channels are drained after every step, so a ticker that expires several
/// times within one step is reported once, like a slow consumer would see
/// it.
pub fn run(config: &Config, extra_steps: &[Duration]) -> Report {
    let start = config.clock.start_or_now();
    let clock = FakeClock::new_at(start);

    let mut sources: Vec<(&str, Source)> = Vec::new();
    for spec in &config.timers {
        sources.push((spec.name.as_str(), Source::Timer(clock.new_timer(spec.after))));
    }
    for spec in &config.tickers {
        sources.push((spec.name.as_str(), Source::Ticker(clock.new_ticker(spec.period))));
    }
    debug!(waiters = clock.waiter_count(), "registered scenario");

    let mut firings = drain(&sources, 0, start);

    let steps = config
        .steps
        .iter()
        .map(|step| (step.label.as_deref(), step.advance))
        .chain(extra_steps.iter().map(|advance| (None, *advance)));
    for (index, (label, advance)) in steps.enumerate() {
        let step = index + 1;
        clock.advance(advance);
        info!(step, label, ?advance, now = ?clock.now(), "advanced");
        firings.extend(drain(&sources, step, start));
    }

    Report {
        firings,
        elapsed: clock.since(start),
        pending: clock.waiter_count(),
    }
}

/// Collects whatever is waiting on each channel, in firing order.
fn drain(sources: &[(&str, Source)], step: usize, start: SystemTime) -> Vec<Firing> {
    let mut firings: Vec<(SystemTime, Firing)> = sources
        .iter()
        .filter_map(|(name, source)| {
            let at = source.chan().try_recv().ok()?;
            let firing = Firing {
                step,
                name: (*name).to_owned(),
                offset: at.duration_since(start).unwrap_or_default(),
            };
            Some((at, firing))
        })
        .collect();
    // stable, so equal instants keep registration order
    firings.sort_by_key(|(at, _)| *at);
    firings.into_iter().map(|(_, firing)| firing).collect()
}
