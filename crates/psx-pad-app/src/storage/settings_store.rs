use super::keys::StorageKey;
use crate::prelude::*;
use embedded_storage_async::nor_flash::NorFlash;
use psx_bus::{PadSettings, RecordError, RECORD_LEN};
use sequential_storage::cache::NoCache;
use sequential_storage::map::{MapConfig, MapStorage, SerializationError};
use sequential_storage::Error;

/// The fixed-layout settings record as stored in flash.
///
/// Validation happens in [`PadSettings::from_record`] so that a corrupt
/// record can be told apart from a storage failure.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct SettingsRecord(pub [u8; RECORD_LEN]);

impl<'a> sequential_storage::map::Value<'a> for SettingsRecord {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, SerializationError> {
        let dst = buffer
            .get_mut(..RECORD_LEN)
            .ok_or(SerializationError::BufferTooSmall)?;
        dst.copy_from_slice(&self.0);
        Ok(RECORD_LEN)
    }

    fn deserialize_from(
        buffer: &'a [u8],
    ) -> Result<(Self, usize), SerializationError> {
        let record = buffer
            .get(..RECORD_LEN)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(SerializationError::InvalidFormat)?;
        Ok((Self(record), RECORD_LEN))
    }
}

/// Persisted [`PadSettings`], backed by a `sequential-storage` map in the
/// flash partition reserved by `memory.x`.
pub struct SettingsStore<Flash: NorFlash, const N: usize> {
    map: MapStorage<u16, Flash, NoCache>,
    buffer: [u8; N],
    settings: PadSettings,
}

impl<Flash: NorFlash, const N: usize> SettingsStore<Flash, N> {
    /// Creates the store and loads the saved settings, falling back to the
    /// defaults when nothing valid is stored.
    pub fn new(flash: Flash) -> Self {
        // Our memory.x file should declare the following
        extern "C" {
            static __storage_start: u32;
            static __storage_end: u32;
        }

        let range = unsafe {
            let start = &__storage_start as *const u32 as u32;
            let end = &__storage_end as *const u32 as u32;
            start..end
        };
        let config = MapConfig::new(range);
        let map = MapStorage::new(flash, config, NoCache::new());
        let mut store =
            Self { map, buffer: [0; N], settings: PadSettings::default() };

        store.settings = match embassy_futures::block_on(store.load()) {
            Ok(Some(Ok(settings))) => {
                info!("Loaded settings: {:?}", settings);
                settings
            }
            Ok(Some(Err(e))) => {
                warn!("Stored settings rejected: {:?}", e);
                PadSettings::default()
            }
            Ok(None) => {
                info!("No stored settings, using defaults");
                PadSettings::default()
            }
            Err(_) => {
                warn!("Failed to read settings, using defaults");
                PadSettings::default()
            }
        };

        store
    }

    /// Loads the record from persistent storage.
    async fn load(
        &mut self,
    ) -> Result<Option<Result<PadSettings, RecordError>>, Error<Flash::Error>>
    {
        let key = StorageKey::PadSettings.into();
        let record: Option<SettingsRecord> =
            self.map.fetch_item(&mut self.buffer, &key).await?;
        Ok(record.map(|record| PadSettings::from_record(&record.0)))
    }

    pub fn settings(&self) -> PadSettings {
        self.settings
    }

    /// Writes `settings` to flash. The cached copy only changes once the
    /// write went through.
    pub async fn save(
        &mut self,
        settings: PadSettings,
    ) -> Result<(), Error<Flash::Error>> {
        let key = StorageKey::PadSettings.into();
        let record = SettingsRecord(settings.to_record());
        self.map.store_item(&mut self.buffer, &key, &record).await?;
        self.settings = settings;
        Ok(())
    }
}
