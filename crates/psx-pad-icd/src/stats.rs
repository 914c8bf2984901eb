use postcard_schema::Schema;
use psx_bus::{Button, ButtonSnapshot, CalibrationStatus, TransactionStats};
use serde::{Deserialize, Serialize};

/// Button sampling loop timing, reset after every debug dump.
#[derive(Debug, PartialEq, Serialize, Deserialize, Schema, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplingStats {
    pub target_interval_us: u32,
    pub min_interval_us: u32,
    pub max_interval_us: u32,
    pub avg_interval_us: u32,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Schema, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadStats {
    pub total: u32,
    pub controller: u32,
    pub memory_card: u32,
    pub invalid: u32,
    pub timeouts: u32,
    pub last_invalid_address: u8,
    pub last_invalid_command: u8,
    pub min_interval_us: u32,
    pub max_interval_us: u32,
    pub avg_interval_us: u32,
    /// Console poll rate in millihertz.
    pub poll_rate_mhz: u32,
    pub sampling: SamplingStats,
    /// Raw wire bytes of the last sample, active low.
    pub buttons: [u8; 2],
}

impl PadStats {
    pub fn new(
        stats: TransactionStats,
        sampling: SamplingStats,
        buttons: ButtonSnapshot,
    ) -> Self {
        Self {
            total: stats.total,
            controller: stats.controller,
            memory_card: stats.memory_card,
            invalid: stats.invalid,
            timeouts: stats.timeouts,
            last_invalid_address: stats.last_invalid_address,
            last_invalid_command: stats.last_invalid_command,
            min_interval_us: stats.min_interval_us,
            max_interval_us: stats.max_interval_us,
            avg_interval_us: stats.avg_interval_us,
            poll_rate_mhz: stats.poll_rate_mhz(),
            sampling,
            buttons: [buttons.buttons1, buttons.buttons2],
        }
    }

    pub fn snapshot(&self) -> ButtonSnapshot {
        ButtonSnapshot::new(self.buttons[0], self.buttons[1])
    }

    /// Names of the buttons held in the last sample.
    pub fn pressed(&self) -> impl Iterator<Item = &'static str> {
        let snapshot = self.snapshot();
        Button::ALL
            .into_iter()
            .filter(move |b| snapshot.is_pressed(*b))
            .map(Button::name)
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Schema, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckMode {
    Fixed,
    Calibrated,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Schema, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckStatus {
    pub mode: AckMode,
    pub pulse_us: u8,
    pub post_wait_us: u8,
    pub locked: bool,
    pub started: bool,
}

impl AckStatus {
    pub fn new(mode: AckMode, status: CalibrationStatus) -> Self {
        Self {
            mode,
            pulse_us: status.pulse_us,
            post_wait_us: status.post_wait_us,
            locked: status.locked,
            started: status.started,
        }
    }
}

impl From<&psx_bus::AckMode> for AckMode {
    fn from(value: &psx_bus::AckMode) -> Self {
        match value {
            psx_bus::AckMode::Fixed { .. } => Self::Fixed,
            psx_bus::AckMode::Calibrated(_) => Self::Calibrated,
        }
    }
}
