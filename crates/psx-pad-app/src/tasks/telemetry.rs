use crate::prelude::*;
use heapless::String;

const DUMP_INTERVAL_SECS: u64 = 2;

/// Periodic statistics dump, active in debug mode.
#[embassy_executor::task]
pub async fn telemetry_task() {
    let mut dumps: u32 = 0;
    loop {
        Timer::after(Duration::from_secs(DUMP_INTERVAL_SECS)).await;
        if !debug_mode() {
            continue;
        }
        dumps = dumps.wrapping_add(1);

        let stats = PadStats::new(
            TELEMETRY.snapshot(),
            SAMPLING.stats(),
            SAMPLING.last_sample(),
        );
        let cal = TELEMETRY.calibration();

        info!("=== Stats ({}) ===", dumps);
        info!(
            "Transactions: total={} controller={} memcard={} invalid={} timeout={}",
            stats.total,
            stats.controller,
            stats.memory_card,
            stats.invalid,
            stats.timeouts
        );
        if stats.invalid > 0 {
            info!(
                "Last invalid addr: {=u8:#04x}, cmd: {=u8:#04x}",
                stats.last_invalid_address,
                stats.last_invalid_command
            );
        }
        if stats.avg_interval_us > 0 {
            info!(
                "Poll interval (us): min={} max={} avg={}, rate {}.{=u32:03} Hz",
                stats.min_interval_us,
                stats.max_interval_us,
                stats.avg_interval_us,
                stats.poll_rate_mhz / 1000,
                stats.poll_rate_mhz % 1000
            );
        }
        let sampling = stats.sampling;
        if sampling.avg_interval_us > 0 {
            info!(
                "Sample interval (us): target={} min={} max={} avg={}",
                sampling.target_interval_us,
                sampling.min_interval_us,
                sampling.max_interval_us,
                sampling.avg_interval_us
            );
        }

        let mut pressed: String<96> = String::new();
        for name in stats.pressed() {
            // Overflow only truncates the log line.
            let _ = pressed.push_str(name);
            let _ = pressed.push(' ');
        }
        info!(
            "Buttons: {=u8:#04x} {=u8:#04x} pressed: {=str}",
            stats.buttons[0],
            stats.buttons[1],
            pressed.as_str()
        );
        info!(
            "Ack: pulse={}us post={}us locked={} started={}",
            cal.pulse_us,
            cal.post_wait_us,
            cal.locked,
            cal.started
        );

        TELEMETRY.request_interval_reset();
        SAMPLING.reset_intervals();
    }
}
