use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Default trailing window over which blinks are counted.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// How the engine turns blink events into a blinks-per-minute figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    /// Exact count of blinks within the trailing window.
    #[default]
    TrailingWindow,
    /// Lifetime blink count divided by minutes since engine start. Decays
    /// toward zero over long sessions.
    LifetimeAverage,
}

/// Trailing-window blink counter.
///
/// Timestamps come from a monotonic clock and are appended in order; no
/// reordering is attempted. Expired timestamps are dropped on read.
#[derive(Debug, Clone)]
pub struct BlinkRateWindow {
    window: Duration,
    timestamps: VecDeque<Instant>,
}

impl BlinkRateWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timestamps: VecDeque::new(),
        }
    }

    /// Record a blink that completed at `at`.
    pub fn record(&mut self, at: Instant) {
        self.timestamps.push_back(at);
    }

    /// Drop expired events and return how many blinks fall in
    /// `[now - window, now]`.
    pub fn rate(&mut self, now: Instant) -> u32 {
        // Early in process life `now - window` may precede the clock origin;
        // nothing can be older than that, so there is nothing to prune.
        if let Some(cutoff) = now.checked_sub(self.window) {
            while self.timestamps.front().is_some_and(|&ts| ts < cutoff) {
                self.timestamps.pop_front();
            }
        }
        u32::try_from(self.timestamps.len()).unwrap_or(u32::MAX)
    }

    /// Events currently held, including ones a read would prune.
    pub fn pending(&self) -> usize {
        self.timestamps.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Lifetime average in blinks per minute, truncated to a whole number.
///
/// Returns 0 until at least 1e-3 minutes have elapsed since `started`.
pub fn lifetime_rate(total_blinks: u64, started: Instant, now: Instant) -> u32 {
    let elapsed_min = now.saturating_duration_since(started).as_secs_f64() / 60.0;
    if elapsed_min < 1e-3 {
        return 0;
    }
    let rate = total_blinks as f64 / elapsed_min;
    if rate >= u32::MAX as f64 {
        u32::MAX
    } else {
        rate as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_reports_zero() {
        let mut w = BlinkRateWindow::new(DEFAULT_WINDOW);
        assert_eq!(w.rate(Instant::now()), 0);
    }

    #[test]
    fn test_counts_events_inside_window() {
        let t0 = Instant::now();
        let mut w = BlinkRateWindow::new(DEFAULT_WINDOW);
        w.record(t0);
        w.record(t0 + Duration::from_secs(10));
        w.record(t0 + Duration::from_secs(30));
        assert_eq!(w.rate(t0 + Duration::from_secs(31)), 3);
    }

    #[test]
    fn test_prunes_events_older_than_window() {
        let t0 = Instant::now();
        let mut w = BlinkRateWindow::new(DEFAULT_WINDOW);
        w.record(t0);
        w.record(t0 + Duration::from_secs(20));
        w.record(t0 + Duration::from_secs(50));

        // Exactly at the boundary the first event is still included.
        assert_eq!(w.rate(t0 + Duration::from_secs(60)), 3);
        assert_eq!(w.rate(t0 + Duration::from_secs(61)), 2);
        assert_eq!(w.pending(), 2);
        assert_eq!(w.rate(t0 + Duration::from_secs(111)), 0);
        assert_eq!(w.pending(), 0);
    }

    #[test]
    fn test_rate_equals_count_in_trailing_range() {
        let t0 = Instant::now();
        let mut w = BlinkRateWindow::new(DEFAULT_WINDOW);
        let offsets: Vec<u64> = (0..200).step_by(7).collect();
        for &s in &offsets {
            w.record(t0 + Duration::from_secs(s));
        }
        for now in [199u64, 220, 241, 255, 260] {
            let expected = offsets.iter().filter(|&&s| s + 60 >= now).count() as u32;
            assert_eq!(w.rate(t0 + Duration::from_secs(now)), expected);
        }
    }

    #[test]
    fn test_custom_window() {
        let t0 = Instant::now();
        let mut w = BlinkRateWindow::new(Duration::from_secs(5));
        w.record(t0);
        assert_eq!(w.rate(t0 + Duration::from_secs(5)), 1);
        assert_eq!(w.rate(t0 + Duration::from_secs(6)), 0);
    }

    #[test]
    fn test_lifetime_rate() {
        let t0 = Instant::now();
        assert_eq!(lifetime_rate(5, t0, t0), 0);
        assert_eq!(lifetime_rate(12, t0, t0 + Duration::from_secs(120)), 6);
        assert_eq!(lifetime_rate(1, t0, t0 + Duration::from_secs(30)), 2);
    }
}
