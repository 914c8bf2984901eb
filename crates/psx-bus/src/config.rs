/// Bus timing tunables.
///
/// Different hosts and board revisions want different timeouts; those are
/// just different values of this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Bound on the wait for the first clock edge of a byte.
    pub byte_timeout_us: u32,
    /// Bound on the wait for every other clock edge.
    pub edge_timeout_us: u32,
    /// Delay between the last bit of a byte and the acknowledge pulse.
    pub ack_delay_us: u32,
    /// Settling time before select is re-checked at transaction start.
    pub debounce_us: u32,
    pub ack: AckMode,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            byte_timeout_us: 200,
            edge_timeout_us: 200,
            ack_delay_us: 0,
            debounce_us: 1,
            ack: AckMode::Calibrated(CalibrationConfig::default()),
        }
    }
}

/// Where the acknowledge pulse width and post-acknowledge wait come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckMode {
    Fixed { pulse_us: u8, post_wait_us: u8 },
    Calibrated(CalibrationConfig),
}

impl AckMode {
    pub const FIXED_DEFAULT: Self = Self::Fixed { pulse_us: 3, post_wait_us: 50 };
}

/// Search space and trial rules of the acknowledge timing calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationConfig {
    pub pulse_min_us: u8,
    pub pulse_max_us: u8,
    pub post_min_us: u8,
    pub post_max_us: u8,
    pub step_us: u8,
    /// Address arrivals observed per grid point.
    pub trial_len: u8,
    /// Wall-clock bound per grid point.
    pub trial_timeout_us: u64,
    /// Minimum command success rate, in percent, for a point to qualify.
    pub success_threshold_pct: u8,
    /// Silence after which all calibration state is thrown away.
    pub idle_timeout_us: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            pulse_min_us: 1,
            pulse_max_us: 6,
            post_min_us: 0,
            post_max_us: 6,
            step_us: 1,
            trial_len: 8,
            trial_timeout_us: 10_000_000,
            success_threshold_pct: 50,
            idle_timeout_us: 5_000_000,
        }
    }
}

/// "PSXC"
pub const CONFIG_MAGIC: u32 = 0x5053_5843;
/// Encoded size of a [`PadSettings`] record.
pub const RECORD_LEN: usize = 12;

/// User settings persisted across power cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadSettings {
    pub debug: bool,
    pub latching: bool,
}

impl Default for PadSettings {
    fn default() -> Self {
        Self { debug: false, latching: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    Length(usize),
    Magic(u32),
    Checksum { stored: u32, computed: u32 },
}

impl core::fmt::Display for RecordError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RecordError::Length(len) => {
                write!(f, "settings record has {} bytes", len)
            }
            RecordError::Magic(magic) => {
                write!(f, "bad settings magic: {:#010x}", magic)
            }
            RecordError::Checksum { stored, computed } => write!(
                f,
                "settings checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored, computed
            ),
        }
    }
}

fn checksum(head: &[u8]) -> u32 {
    let magic = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
    head[4..8]
        .iter()
        .fold(magic, |sum, b| sum.wrapping_add(*b as u32))
}

impl PadSettings {
    /// Encode as the fixed on-flash record:
    /// magic (u32 LE), debug, latching, 2 reserved bytes, checksum (u32 LE).
    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut record = [0u8; RECORD_LEN];
        record[0..4].copy_from_slice(&CONFIG_MAGIC.to_le_bytes());
        record[4] = self.debug as u8;
        record[5] = self.latching as u8;
        let sum = checksum(&record[..8]);
        record[8..12].copy_from_slice(&sum.to_le_bytes());
        record
    }

    pub fn from_record(record: &[u8]) -> Result<Self, RecordError> {
        if record.len() < RECORD_LEN {
            return Err(RecordError::Length(record.len()));
        }
        let magic =
            u32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        if magic != CONFIG_MAGIC {
            return Err(RecordError::Magic(magic));
        }
        let stored =
            u32::from_le_bytes([record[8], record[9], record[10], record[11]]);
        let computed = checksum(&record[..8]);
        if stored != computed {
            return Err(RecordError::Checksum { stored, computed });
        }
        Ok(Self { debug: record[4] != 0, latching: record[5] != 0 })
    }

    /// Decode, falling back to defaults for anything invalid.
    pub fn from_record_or_default(record: &[u8]) -> Self {
        Self::from_record(record).unwrap_or_default()
    }
}
