use crate::stats::TransactionStats;

/// What the status LED is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedStatus {
    #[default]
    Ready,
    Polling,
    Error,
}

impl LedStatus {
    pub const fn blinks(self) -> u32 {
        match self {
            LedStatus::Ready => 1,
            LedStatus::Polling => 2,
            LedStatus::Error => 3,
        }
    }
}

const SLOT_US: u64 = 300_000;
const ON_US: u64 = 100_000;
const PAUSE_US: u64 = 700_000;
/// Transactions seen within this window count as "polling".
const ACTIVITY_WINDOW_US: u64 = 1_000;

/// Blink pattern generator.
///
/// Each status blinks `n` times (100 ms on in a 300 ms slot) and then stays
/// dark for 700 ms. In debug mode the LED is instead lit whenever the host
/// is polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPattern {
    status: LedStatus,
    cycle_start_us: u64,
    debug: bool,
}

impl StatusPattern {
    pub const fn new(debug: bool) -> Self {
        Self { status: LedStatus::Ready, cycle_start_us: 0, debug }
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn set_status(&mut self, status: LedStatus) {
        self.status = status;
    }

    pub fn status(&self) -> LedStatus {
        self.status
    }

    /// Whether the LED should be lit at `now_us`.
    pub fn level(&mut self, now_us: u64) -> bool {
        if self.debug {
            return self.status == LedStatus::Polling;
        }
        let blinks = self.status.blinks() as u64;
        let cycle = blinks * SLOT_US + PAUSE_US;
        let mut elapsed = now_us.saturating_sub(self.cycle_start_us);
        if elapsed >= cycle {
            self.cycle_start_us = now_us;
            elapsed = 0;
        }
        elapsed / SLOT_US < blinks && elapsed % SLOT_US < ON_US
    }
}

/// Derives the LED status from the transaction counters.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last_total: u32,
    last_activity_us: u64,
    status: LedStatus,
}

impl StatusTracker {
    pub const fn new() -> Self {
        Self { last_total: 0, last_activity_us: 0, status: LedStatus::Ready }
    }

    pub fn update(&mut self, stats: &TransactionStats, now_us: u64) -> LedStatus {
        if stats.total != self.last_total {
            self.last_total = stats.total;
            self.last_activity_us = now_us;
            self.status = LedStatus::Polling;
        } else if now_us.saturating_sub(self.last_activity_us)
            > ACTIVITY_WINDOW_US
        {
            self.status = if stats.invalid > 0 || stats.timeouts > 0 {
                LedStatus::Error
            } else {
                LedStatus::Ready
            };
        }
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit_ranges(pattern: &mut StatusPattern, until_us: u64) -> Vec<(u64, u64)> {
        let mut ranges = Vec::new();
        let mut start = None;
        let mut now = 0;
        while now < until_us {
            match (pattern.level(now), start) {
                (true, None) => start = Some(now),
                (false, Some(s)) => {
                    ranges.push((s, now));
                    start = None;
                }
                _ => {}
            }
            now += 10_000;
        }
        ranges
    }

    #[test]
    fn ready_blinks_once_per_second() {
        let mut pattern = StatusPattern::new(false);
        let ranges = lit_ranges(&mut pattern, 2_000_000);
        assert_eq!(ranges, [(0, 100_000), (1_000_000, 1_100_000)]);
    }

    #[test]
    fn error_blinks_three_times() {
        let mut pattern = StatusPattern::new(false);
        pattern.set_status(LedStatus::Error);
        let ranges = lit_ranges(&mut pattern, 1_600_000);
        assert_eq!(
            ranges,
            [(0, 100_000), (300_000, 400_000), (600_000, 700_000)]
        );
    }

    #[test]
    fn debug_mode_follows_polling() {
        let mut pattern = StatusPattern::new(true);
        assert!(!pattern.level(0));
        pattern.set_status(LedStatus::Polling);
        assert!(pattern.level(250_000));
        pattern.set_status(LedStatus::Error);
        assert!(!pattern.level(50_000));
    }

    #[test]
    fn tracker_reports_activity_then_errors() {
        let mut tracker = StatusTracker::new();
        let mut stats = TransactionStats::default();
        assert_eq!(tracker.update(&stats, 5_000), LedStatus::Ready);
        stats.total = 1;
        assert_eq!(tracker.update(&stats, 6_000), LedStatus::Polling);
        assert_eq!(tracker.update(&stats, 6_500), LedStatus::Polling);
        stats.timeouts = 1;
        assert_eq!(tracker.update(&stats, 8_000), LedStatus::Error);
    }
}
