#![forbid(unsafe_code)]

//! Injectable clocks.
//!
//! Code that needs the current time, a timeout, or a periodic tick takes a
//! [`Clock`] instead of calling the system clock directly. Production code
//! passes a [`RealClock`]; tests pass a [`FakeClock`] and move virtual time
//! forward explicitly with [`FakeClock::advance`].
//!
//! ```
//! use clockwork::{Clock, FakeClock};
//! use std::time::{Duration, UNIX_EPOCH};
//!
//! let clock = FakeClock::new_at(UNIX_EPOCH);
//! let timer = clock.new_timer(Duration::from_secs(5));
//!
//! clock.advance(Duration::from_secs(4));
//! assert!(timer.chan().try_recv().is_err());
//!
//! clock.advance(Duration::from_secs(1));
//! assert_eq!(timer.chan().try_recv(), Ok(UNIX_EPOCH + Duration::from_secs(5)));
//! ```

mod clock;
mod error;
pub mod fake;
pub mod real;

pub use clock::{Callback, Clock, Ticker, Timer};
pub use error::Error;
pub use fake::FakeClock;
pub use real::RealClock;
