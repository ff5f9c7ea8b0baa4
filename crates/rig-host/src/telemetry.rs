//! Telemetry loop: samples the shared statistics and renders status frames.
//!
//! The reader never waits long for the statistics lock. If the miner holds
//! it past the timeout the frame is skipped and the next poll tries again.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info};
use rig_core::{SearchControl, SearchStats, SharedStats};

use crate::config::TelemetryConfig;
use crate::display::StatusDisplay;

const TARGET: &str = "telemetry";

pub const SEPARATOR: &str = "------------------";

pub const SOLUTION_BANNER: &str = "*** BLOCK FOUND ***";

/// What a poll put on the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Lock not acquired in time; display untouched.
    Skipped,
    Status,
    Solution,
}

/// The six status lines, top to bottom.
pub fn status_lines(title: &str, stats: &SearchStats) -> [String; 6] {
    [
        title.to_string(),
        SEPARATOR.to_string(),
        format!("Rate: {:.1} H/s", stats.rate),
        format!("Total: {}", stats.total_iterations),
        format!("Best: {} zeros", stats.best_score),
        format!("Nonce: {}", stats.counter),
    ]
}

pub struct Telemetry<D> {
    display: D,
    shared: SharedStats,
    title: String,
    contrast: u8,
    lock_timeout: Duration,
    solutions_seen: u32,
    skipped: u64,
}

impl<D: StatusDisplay> Telemetry<D> {
    pub fn new(display: D, shared: SharedStats, config: &TelemetryConfig) -> Self {
        Telemetry {
            display,
            shared,
            title: config.title.clone(),
            contrast: config.contrast,
            lock_timeout: config.lock_timeout(),
            solutions_seen: 0,
            skipped: 0,
        }
    }

    /// Bring the display up with the boot screen.
    pub fn start(&mut self) -> Result<()> {
        self.display.init()?;
        self.display.clear()?;
        self.display.set_contrast(self.contrast)?;
        self.display.write_text(0, &self.title)?;
        self.display.write_text(2, "Initializing...")?;
        Ok(())
    }

    /// Render one frame from the latest statistics.
    pub fn poll(&mut self) -> Result<Frame> {
        let Some(stats) = self.shared.try_snapshot(self.lock_timeout) else {
            self.skipped += 1;
            debug!(target: TARGET, "stats busy, frame skipped ({} so far)", self.skipped);
            return Ok(Frame::Skipped);
        };

        if stats.solutions < self.solutions_seen {
            // The shared count restarted under us; follow it down.
            self.solutions_seen = stats.solutions;
        }
        if stats.solutions > self.solutions_seen {
            self.solutions_seen = stats.solutions;
            self.display.clear()?;
            self.display.write_text(2, SOLUTION_BANNER)?;
            return Ok(Frame::Solution);
        }

        self.display.clear()?;
        self.display.set_contrast(self.contrast)?;
        for (page, line) in status_lines(&self.title, &stats).iter().enumerate() {
            self.display.write_text(page as u8, line)?;
        }
        Ok(Frame::Status)
    }

    /// Poll every `interval` until `control` is cancelled or `deadline`
    /// passes.
    pub fn run(
        &mut self,
        control: &SearchControl,
        interval: Duration,
        deadline: Option<Instant>,
    ) -> Result<()> {
        info!(target: TARGET, "telemetry started, frame every {:?}", interval);
        loop {
            let wake = Instant::now() + interval;
            while Instant::now() < wake {
                if control.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                    info!(target: TARGET, "telemetry stopped ({} frames skipped)", self.skipped);
                    return Ok(());
                }
                thread::sleep(Duration::from_millis(10).min(interval));
            }
            self.poll()?;
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Frames dropped because the lock was busy.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
