//! Time sources and scheduling hooks.
//!
//! The search loop never reads the system clock directly; it is handed a
//! [`Clock`] so tests can step time by hand.

use core::cell::Cell;
use core::time::Duration;

/// Monotonic microsecond clock plus wall-clock seconds.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin.
    fn now_micros(&self) -> u64;

    /// Wall-clock seconds used to stamp the work buffer.
    fn unix_seconds(&self) -> u32 {
        (self.now_micros() / 1_000_000) as u32
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_micros(&self) -> u64 {
        (**self).now_micros()
    }

    fn unix_seconds(&self) -> u32 {
        (**self).unix_seconds()
    }
}

/// Cooperative scheduling hooks.
pub trait Pacer {
    /// Give other work a chance to run.
    fn yield_now(&mut self);

    /// Block for `duration`.
    fn pause(&mut self, duration: Duration);
}

/// Clock driven by hand. Each read can optionally advance it by a fixed
/// step, which makes a loop see time pass at a steady rate.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
    step: u64,
    unix: u32,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        ManualClock {
            now: Cell::new(start_us),
            step: 0,
            unix: 0,
        }
    }

    /// Advance by `step_us` after every read.
    pub fn with_step(mut self, step_us: u64) -> Self {
        self.step = step_us;
        self
    }

    pub fn with_unix_seconds(mut self, seconds: u32) -> Self {
        self.unix = seconds;
        self
    }

    pub fn advance(&self, us: u64) {
        self.now.set(self.now.get() + us);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }

    fn unix_seconds(&self) -> u32 {
        self.unix
    }
}

#[cfg(feature = "std")]
pub use self::host::{StdClock, ThreadPacer};

#[cfg(feature = "std")]
mod host {
    use std::time::{Instant, SystemTime, UNIX_EPOCH};

    use super::{Clock, Duration, Pacer};

    /// Clock backed by `std::time`.
    #[derive(Debug, Clone, Copy)]
    pub struct StdClock {
        origin: Instant,
    }

    impl StdClock {
        pub fn new() -> Self {
            StdClock {
                origin: Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for StdClock {
        fn now_micros(&self) -> u64 {
            self.origin.elapsed().as_micros() as u64
        }

        fn unix_seconds(&self) -> u32 {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(0)
        }
    }

    /// Pacer that yields and sleeps the current thread.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ThreadPacer;

    impl Pacer for ThreadPacer {
        fn yield_now(&mut self) {
            std::thread::yield_now();
        }

        fn pause(&mut self, duration: Duration) {
            std::thread::sleep(duration);
        }
    }
}
