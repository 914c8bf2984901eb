use crate::prelude::*;
use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use psx_bus::{ButtonSnapshot, IntervalStats};

/// Target button sampling period.
pub const SAMPLE_INTERVAL_US: u64 = 1000;

#[derive(Clone, Copy)]
struct SampleLog {
    last_sample: ButtonSnapshot,
    last_us: Option<u64>,
    intervals: IntervalStats,
}

impl SampleLog {
    const fn new() -> Self {
        Self {
            last_sample: ButtonSnapshot::RELEASED,
            last_us: None,
            intervals: IntervalStats::new(),
        }
    }
}

/// Timing and last value of the sampling loop, for the debug dump and the
/// USB console.
pub struct SamplingMonitor {
    log: BlockingMutex<CriticalSectionRawMutex, RefCell<SampleLog>>,
}

impl SamplingMonitor {
    pub const fn new() -> Self {
        Self { log: BlockingMutex::new(RefCell::new(SampleLog::new())) }
    }

    fn record(&self, now_us: u64, sample: ButtonSnapshot) {
        self.log.lock(|log| {
            let mut log = log.borrow_mut();
            if let Some(last) = log.last_us {
                log.intervals.add(IntervalStats::between(last, now_us));
            }
            log.last_us = Some(now_us);
            log.last_sample = sample;
        })
    }

    pub fn last_sample(&self) -> ButtonSnapshot {
        self.log.lock(|log| log.borrow().last_sample)
    }

    pub fn stats(&self) -> SamplingStats {
        self.log.lock(|log| {
            let intervals = log.borrow().intervals;
            SamplingStats {
                target_interval_us: SAMPLE_INTERVAL_US as u32,
                min_interval_us: intervals.min_us(),
                max_interval_us: intervals.max_us(),
                avg_interval_us: intervals.avg_us(),
            }
        })
    }

    /// Restart the interval statistics. The next interval is still measured
    /// from the last sample.
    pub fn reset_intervals(&self) {
        self.log.lock(|log| {
            log.borrow_mut().intervals = IntervalStats::new();
        })
    }
}

pub static SAMPLING: SamplingMonitor = SamplingMonitor::new();

/// Reads the buttons on a fixed schedule and hands them to the protocol
/// context.
#[embassy_executor::task]
pub async fn sampling_task(bank: ButtonBank) {
    let mut publisher = BUTTONS.publisher();
    // Deadlines are absolute, a late tick does not shift the schedule.
    let mut ticker = Ticker::every(Duration::from_micros(SAMPLE_INTERVAL_US));
    loop {
        ticker.next().await;
        let sample = bank.sample();
        publisher.publish(sample);
        SAMPLING.record(Instant::now().as_micros(), sample);
    }
}
