/// Keys of the items kept in the settings partition.
#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageKey {
    PadSettings,
}

impl From<StorageKey> for u16 {
    fn from(key: StorageKey) -> u16 {
        match key {
            StorageKey::PadSettings => 0x0010,
        }
    }
}
