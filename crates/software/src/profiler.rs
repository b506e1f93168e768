//! Tracks how long the main loop spends busy, reporting once every few windows.

use embassy_time::Duration;

/// Busy time accumulated over a number of windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProfileReport {
    /// Windows covered by this report.
    pub windows: u32,
    /// Sum of the busy time of every window.
    pub total: Duration,
    /// Mean busy time per window.
    pub average: Duration,
    /// Longest single window.
    pub worst: Duration,
}

/// Accumulates busy durations and emits a [`ProfileReport`] every `windows_per_report` windows.
#[derive(Debug, Clone)]
pub struct LoopProfiler {
    windows_per_report: u32,
    windows: u32,
    total: Duration,
    worst: Duration,
}

impl LoopProfiler {
    /// Constructs a [`LoopProfiler`]. A report interval of zero is treated as one.
    pub fn new(windows_per_report: u32) -> Self {
        Self {
            windows_per_report: windows_per_report.max(1),
            windows: 0,
            total: Duration::from_ticks(0),
            worst: Duration::from_ticks(0),
        }
    }

    /// Records the busy time of one window, returning a report and starting afresh when the interval is complete.
    pub fn record(&mut self, busy: Duration) -> Option<ProfileReport> {
        self.windows += 1;
        self.total += busy;
        self.worst = self.worst.max(busy);

        if self.windows < self.windows_per_report {
            return None;
        }

        let report = ProfileReport {
            windows: self.windows,
            total: self.total,
            average: self.total / self.windows,
            worst: self.worst,
        };
        *self = Self::new(self.windows_per_report);
        Some(report)
    }
}
