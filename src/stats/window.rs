//! Rolling metrics window

use std::time::{Duration, Instant};

use crate::protocol::constants::METRICS_WINDOW;

/// Rolling (count, bytes) counters over a wall-clock window
///
/// Counters accumulate until at least one window interval has elapsed,
/// then [`MetricsWindow::take_if_elapsed`] hands out a snapshot and
/// resets. One instance tracks one direction (ingest or broadcast).
#[derive(Debug)]
pub struct MetricsWindow {
    interval: Duration,
    window_start: Instant,
    frames: u64,
    bytes: u64,
}

impl MetricsWindow {
    /// Window with the default 1 s interval.
    pub fn new() -> Self {
        Self::with_interval(METRICS_WINDOW)
    }

    /// Window with a custom interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            window_start: Instant::now(),
            frames: 0,
            bytes: 0,
        }
    }

    /// Count one frame of `bytes` bytes.
    pub fn record(&mut self, bytes: usize) {
        self.frames += 1;
        self.bytes += bytes as u64;
    }

    /// Frames counted in the current window.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Bytes counted in the current window.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// If at least one interval has elapsed, return the window's
    /// counters and start a new window. Otherwise `None`.
    pub fn take_if_elapsed(&mut self) -> Option<WindowSnapshot> {
        let elapsed = self.window_start.elapsed();
        if elapsed < self.interval {
            return None;
        }

        let snapshot = WindowSnapshot {
            frames: self.frames,
            bytes: self.bytes,
            elapsed,
        };

        self.frames = 0;
        self.bytes = 0;
        self.window_start = Instant::now();

        Some(snapshot)
    }
}

impl Default for MetricsWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for one completed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Frames counted
    pub frames: u64,
    /// Bytes counted
    pub bytes: u64,
    /// Actual wall time covered
    pub elapsed: Duration,
}

impl WindowSnapshot {
    /// Throughput in KiB per second over the window.
    pub fn kib_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.bytes as f64 / 1024.0) / secs
        } else {
            0.0
        }
    }
}
