use portable_atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::calibrator::CalibrationStatus;

/// Point-in-time copy of the transaction counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransactionStats {
    pub total: u32,
    pub controller: u32,
    pub memory_card: u32,
    pub invalid: u32,
    pub timeouts: u32,
    pub last_invalid_address: u8,
    pub last_invalid_command: u8,
    /// Zero until two polls have been seen.
    pub min_interval_us: u32,
    pub max_interval_us: u32,
    pub avg_interval_us: u32,
    /// Time of the last transaction start, zero if none yet.
    pub last_activity_us: u64,
}

impl TransactionStats {
    /// Poll rate in millihertz, derived from the average interval.
    pub fn poll_rate_mhz(&self) -> u32 {
        if self.avg_interval_us == 0 {
            return 0;
        }
        (1_000_000_000u64 / self.avg_interval_us as u64) as u32
    }
}

/// Transaction counters shared between the protocol context (sole writer)
/// and any number of readers.
///
/// Readers never write counters. Resets are requested through a flag that
/// the protocol context applies at the start of its next transaction.
pub struct Telemetry {
    total: AtomicU32,
    controller: AtomicU32,
    memory_card: AtomicU32,
    invalid: AtomicU32,
    timeouts: AtomicU32,
    last_invalid_address: AtomicU8,
    last_invalid_command: AtomicU8,
    min_interval_us: AtomicU32,
    max_interval_us: AtomicU32,
    avg_interval_us: AtomicU32,
    last_activity_us: AtomicU64,
    reset_all: AtomicBool,
    reset_intervals: AtomicBool,
    cal_pulse_us: AtomicU8,
    cal_post_wait_us: AtomicU8,
    cal_flags: AtomicU8,
}

const CAL_LOCKED: u8 = 1 << 0;
const CAL_STARTED: u8 = 1 << 1;

/// Running minimum, maximum and average of a stream of intervals.
///
/// Zero everywhere until the first interval. Once the count is exhausted the
/// average starts over; minimum and maximum are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntervalStats {
    min_us: u32,
    max_us: u32,
    sum_us: u64,
    count: u32,
}

impl IntervalStats {
    pub const fn new() -> Self {
        Self { min_us: 0, max_us: 0, sum_us: 0, count: 0 }
    }

    /// Interval between two timestamps, clamped to `u32`.
    pub fn between(earlier_us: u64, later_us: u64) -> u32 {
        later_us.saturating_sub(earlier_us).min(u32::MAX as u64) as u32
    }

    pub fn add(&mut self, interval_us: u32) {
        if self.count == 0 || interval_us < self.min_us {
            self.min_us = interval_us;
        }
        self.max_us = self.max_us.max(interval_us);
        if self.count == u32::MAX {
            self.sum_us = 0;
            self.count = 0;
        }
        self.sum_us += interval_us as u64;
        self.count += 1;
    }

    pub fn min_us(&self) -> u32 {
        self.min_us
    }

    pub fn max_us(&self) -> u32 {
        self.max_us
    }

    pub fn avg_us(&self) -> u32 {
        match self.count {
            0 => 0,
            n => (self.sum_us / n as u64) as u32,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Protocol-side poll interval accumulator. Not shared.
#[derive(Default)]
pub(crate) struct IntervalTracker {
    last_poll_us: u64,
    stats: IntervalStats,
}

impl IntervalTracker {
    pub(crate) fn record(&mut self, now_us: u64, telemetry: &Telemetry) {
        if self.last_poll_us != 0 {
            self.stats.add(IntervalStats::between(self.last_poll_us, now_us));
            let stats = &self.stats;
            telemetry.min_interval_us.store(stats.min_us(), Ordering::Relaxed);
            telemetry.max_interval_us.store(stats.max_us(), Ordering::Relaxed);
            telemetry.avg_interval_us.store(stats.avg_us(), Ordering::Release);
        }
        // Zero marks "no previous poll".
        self.last_poll_us = now_us.max(1);
    }

    /// Drop accumulated intervals, keeping the last poll time so the next
    /// interval is still measured.
    pub(crate) fn clear(&mut self) {
        self.stats = IntervalStats::new();
    }
}

impl Telemetry {
    pub const fn new() -> Self {
        Self {
            total: AtomicU32::new(0),
            controller: AtomicU32::new(0),
            memory_card: AtomicU32::new(0),
            invalid: AtomicU32::new(0),
            timeouts: AtomicU32::new(0),
            last_invalid_address: AtomicU8::new(0),
            last_invalid_command: AtomicU8::new(0),
            min_interval_us: AtomicU32::new(0),
            max_interval_us: AtomicU32::new(0),
            avg_interval_us: AtomicU32::new(0),
            last_activity_us: AtomicU64::new(0),
            reset_all: AtomicBool::new(false),
            reset_intervals: AtomicBool::new(false),
            cal_pulse_us: AtomicU8::new(0),
            cal_post_wait_us: AtomicU8::new(0),
            cal_flags: AtomicU8::new(0),
        }
    }

    pub fn snapshot(&self) -> TransactionStats {
        TransactionStats {
            total: self.total.load(Ordering::Acquire),
            controller: self.controller.load(Ordering::Relaxed),
            memory_card: self.memory_card.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            last_invalid_address: self
                .last_invalid_address
                .load(Ordering::Relaxed),
            last_invalid_command: self
                .last_invalid_command
                .load(Ordering::Relaxed),
            min_interval_us: self.min_interval_us.load(Ordering::Relaxed),
            max_interval_us: self.max_interval_us.load(Ordering::Relaxed),
            avg_interval_us: self.avg_interval_us.load(Ordering::Acquire),
            last_activity_us: self.last_activity_us.load(Ordering::Relaxed),
        }
    }

    pub fn calibration(&self) -> CalibrationStatus {
        let flags = self.cal_flags.load(Ordering::Acquire);
        CalibrationStatus {
            pulse_us: self.cal_pulse_us.load(Ordering::Relaxed),
            post_wait_us: self.cal_post_wait_us.load(Ordering::Relaxed),
            locked: flags & CAL_LOCKED != 0,
            started: flags & CAL_STARTED != 0,
        }
    }

    /// Ask the protocol context to zero every counter.
    pub fn request_reset(&self) {
        self.reset_all.store(true, Ordering::Release);
    }

    /// Ask the protocol context to restart the poll interval statistics.
    pub fn request_interval_reset(&self) {
        self.reset_intervals.store(true, Ordering::Release);
    }

    // Everything below is only called from the protocol context.

    pub(crate) fn apply_requests(&self, intervals: &mut IntervalTracker) {
        if self.reset_all.swap(false, Ordering::AcqRel) {
            self.reset_intervals.store(false, Ordering::Relaxed);
            for counter in [
                &self.total,
                &self.controller,
                &self.memory_card,
                &self.invalid,
                &self.timeouts,
            ] {
                counter.store(0, Ordering::Relaxed);
            }
            self.last_invalid_address.store(0, Ordering::Relaxed);
            self.last_invalid_command.store(0, Ordering::Relaxed);
            *intervals = IntervalTracker::default();
            self.clear_intervals();
        } else if self.reset_intervals.swap(false, Ordering::AcqRel) {
            intervals.clear();
            self.clear_intervals();
        }
    }

    fn clear_intervals(&self) {
        self.min_interval_us.store(0, Ordering::Relaxed);
        self.max_interval_us.store(0, Ordering::Relaxed);
        self.avg_interval_us.store(0, Ordering::Release);
    }

    #[inline(always)]
    fn bump(counter: &AtomicU32) {
        // Only the protocol context writes counters.
        counter.store(
            counter.load(Ordering::Relaxed).wrapping_add(1),
            Ordering::Release,
        );
    }

    pub(crate) fn record_transaction(&self, now_us: u64) {
        self.last_activity_us.store(now_us, Ordering::Relaxed);
        Self::bump(&self.total);
    }

    pub(crate) fn record_controller(&self) {
        Self::bump(&self.controller);
    }

    pub(crate) fn record_memory_card(&self) {
        Self::bump(&self.memory_card);
    }

    pub(crate) fn record_invalid_address(&self, address: u8) {
        self.last_invalid_address.store(address, Ordering::Relaxed);
        Self::bump(&self.invalid);
    }

    pub(crate) fn record_invalid_command(&self, command: u8) {
        self.last_invalid_command.store(command, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        Self::bump(&self.timeouts);
    }

    pub(crate) fn publish_calibration(&self, status: CalibrationStatus) {
        self.cal_pulse_us.store(status.pulse_us, Ordering::Relaxed);
        self.cal_post_wait_us.store(status.post_wait_us, Ordering::Relaxed);
        let mut flags = 0;
        if status.locked {
            flags |= CAL_LOCKED;
        }
        if status.started {
            flags |= CAL_STARTED;
        }
        self.cal_flags.store(flags, Ordering::Release);
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
