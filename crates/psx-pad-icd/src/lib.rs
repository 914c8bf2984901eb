#![cfg_attr(not(any(test, feature = "use-std")), no_std)]

use postcard_rpc::{endpoints, topics, TopicDirection};
use postcard_schema::Schema;
use psx_bus::PadSettings;
use serde::{Deserialize, Serialize};

mod stats;
pub use stats::*;

// Device Information types
#[derive(Debug, PartialEq, Serialize, Deserialize, Schema, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub hardware_revision: heapless::String<32>,
    pub software_revision: heapless::String<32>,
    pub manufacturer_name: heapless::String<32>,
}

// Persisted settings
#[derive(Debug, PartialEq, Serialize, Deserialize, Schema, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// Periodic telemetry dump and steady LED while polling.
    pub debug: bool,
    /// Hold short presses until the console has read them.
    pub latching: bool,
}

impl Default for Settings {
    fn default() -> Self {
        PadSettings::default().into()
    }
}

impl From<PadSettings> for Settings {
    fn from(value: PadSettings) -> Self {
        Self { debug: value.debug, latching: value.latching }
    }
}

impl From<Settings> for PadSettings {
    fn from(value: Settings) -> Self {
        Self { debug: value.debug, latching: value.latching }
    }
}

endpoints! {
    list = ENDPOINT_LIST;
    omit_std = true;
    | EndpointTy                | RequestTy         | ResponseTy            | Path              |
    | ----------                | ---------         | ----------            | ----              |
    // Telemetry endpoints
    | StatsGetEndpoint          | ()                | PadStats              | "stats/get"       |
    | StatsResetEndpoint        | ()                | ()                    | "stats/reset"     |
    | AckStatusEndpoint         | ()                | AckStatus             | "ack/status"      |
    // Settings endpoints
    | SettingsGetEndpoint       | ()                | Settings              | "settings/get"    |
    | SettingsSetEndpoint       | Settings          | bool                  | "settings/set"    |
    // Device Info endpoint (read-only)
    | DeviceInfoGetEndpoint     | ()                | DeviceInfo            | "device/info"     |
}

topics! {
    list = TOPICS_IN_LIST;
    direction = TopicDirection::ToServer;
    | TopicTy                   | MessageTy     | Path              |
    | -------                   | ---------     | ----              |
}

topics! {
    list = TOPICS_OUT_LIST;
    direction = TopicDirection::ToClient;
    | TopicTy                   | MessageTy     | Path              |
    | -------                   | ---------     | ----              |
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_convert_both_ways() {
        let pad = PadSettings { debug: true, latching: false };
        let wire = Settings::from(pad);
        assert!(wire.debug);
        assert!(!wire.latching);
        assert_eq!(PadSettings::from(wire), pad);
    }

    #[test]
    fn default_settings_match_the_engine() {
        assert_eq!(
            PadSettings::from(Settings::default()),
            PadSettings::default()
        );
    }
}
