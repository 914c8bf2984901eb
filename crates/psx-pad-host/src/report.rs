//! Plain-text rendering of the console responses.

use crate::icd::{AckMode, AckStatus, DeviceInfo, PadStats, Settings};
use std::fmt::Write;

pub fn device_info(info: &DeviceInfo) -> String {
    format!(
        "Manufacturer: {}\nHardware:     {}\nFirmware:     {}\n",
        info.manufacturer_name, info.hardware_revision, info.software_revision
    )
}

pub fn stats(stats: &PadStats) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "Total Trans:  {}", stats.total);
    let _ = writeln!(out, "Controller:   {}", stats.controller);
    let _ = writeln!(out, "MemCard:      {}", stats.memory_card);
    let _ = writeln!(out, "Invalid:      {}", stats.invalid);
    let _ = writeln!(out, "Timeout:      {}", stats.timeouts);
    if stats.invalid > 0 {
        let _ = writeln!(
            out,
            "Last Invalid Addr: 0x{:02X}, Cmd: 0x{:02X}",
            stats.last_invalid_address, stats.last_invalid_command
        );
    }
    if stats.avg_interval_us > 0 {
        let _ = writeln!(
            out,
            "PSX Interval (us): Min={}, Max={}, Avg={}",
            stats.min_interval_us, stats.max_interval_us, stats.avg_interval_us
        );
        let _ = writeln!(
            out,
            "PSX Polling Rate:  {:.2} Hz",
            stats.poll_rate_mhz as f64 / 1000.0
        );
    }
    let sampling = &stats.sampling;
    if sampling.target_interval_us > 0 {
        let _ = writeln!(
            out,
            "BTN Target Rate:   {:.2} Hz ({} us)",
            1_000_000.0 / sampling.target_interval_us as f64,
            sampling.target_interval_us
        );
    }
    if sampling.avg_interval_us > 0 {
        let _ = writeln!(
            out,
            "BTN Interval (us): Min={}, Max={}, Avg={}",
            sampling.min_interval_us,
            sampling.max_interval_us,
            sampling.avg_interval_us
        );
    }
    let _ = writeln!(
        out,
        "Buttons:      0x{:02X} 0x{:02X}",
        stats.buttons[0], stats.buttons[1]
    );
    let pressed: Vec<_> = stats.pressed().collect();
    let _ = writeln!(out, "Pressed: {}", pressed.join(" "));
    out
}

pub fn ack_status(status: &AckStatus) -> String {
    let mode = match status.mode {
        AckMode::Fixed => "fixed",
        AckMode::Calibrated if status.locked => "calibrated (locked)",
        AckMode::Calibrated if status.started => "calibrating",
        AckMode::Calibrated => "calibrating (waiting for console)",
    };
    format!(
        "ACK mode:     {mode}\nACK pulse:    {} us\nPost wait:    {} us\n",
        status.pulse_us, status.post_wait_us
    )
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn settings(settings: &Settings) -> String {
    format!(
        "Debug:        {}\nLatching:     {}\n",
        on_off(settings.debug),
        on_off(settings.latching)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icd::SamplingStats;

    fn sample_stats() -> PadStats {
        PadStats {
            total: 120,
            controller: 118,
            memory_card: 1,
            invalid: 1,
            timeouts: 0,
            last_invalid_address: 0x02,
            last_invalid_command: 0x00,
            min_interval_us: 16_600,
            max_interval_us: 16_700,
            avg_interval_us: 16_667,
            poll_rate_mhz: 59_998,
            sampling: SamplingStats {
                target_interval_us: 1000,
                min_interval_us: 998,
                max_interval_us: 1003,
                avg_interval_us: 1000,
            },
            // START and CROSS held.
            buttons: [0xF7, 0xBF],
        }
    }

    #[test]
    fn stats_report_lists_counters_and_rates() {
        let text = stats(&sample_stats());
        assert!(text.contains("Total Trans:  120\n"));
        assert!(text.contains("Last Invalid Addr: 0x02, Cmd: 0x00\n"));
        assert!(text.contains("PSX Polling Rate:  60.00 Hz\n"));
        assert!(text.contains("BTN Target Rate:   1000.00 Hz (1000 us)\n"));
        assert!(text.contains("Buttons:      0xF7 0xBF\n"));
    }

    #[test]
    fn stats_report_names_pressed_buttons() {
        let text = stats(&sample_stats());
        let pressed = text
            .lines()
            .find_map(|line| line.strip_prefix("Pressed: "))
            .unwrap();
        assert_eq!(pressed.split(' ').count(), 2);
    }

    #[test]
    fn idle_stats_skip_interval_lines() {
        let mut idle = sample_stats();
        idle.invalid = 0;
        idle.avg_interval_us = 0;
        idle.sampling = SamplingStats::default();
        let text = stats(&idle);
        assert!(!text.contains("Last Invalid"));
        assert!(!text.contains("PSX Interval"));
        assert!(!text.contains("BTN"));
    }

    #[test]
    fn ack_report_describes_calibration_phase() {
        let mut status = AckStatus {
            mode: AckMode::Calibrated,
            pulse_us: 6,
            post_wait_us: 0,
            locked: false,
            started: false,
        };
        assert!(ack_status(&status).contains("waiting for console"));
        status.started = true;
        assert!(ack_status(&status).contains("calibrating\n"));
        status.locked = true;
        assert!(ack_status(&status).contains("calibrated (locked)"));
        status.mode = AckMode::Fixed;
        assert!(ack_status(&status).contains("fixed"));
    }

    #[test]
    fn settings_report_uses_on_off() {
        let text = settings(&Settings { debug: true, latching: false });
        assert_eq!(text, "Debug:        on\nLatching:     off\n");
    }
}
