#![no_std]

#[macro_use]
#[doc(hidden)]
pub mod util;

pub mod storage;
pub mod tasks;

use embassy_executor::{InterruptExecutor, SendSpawner};
use embassy_nrf::interrupt;
use embassy_nrf::interrupt::InterruptExt;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use portable_atomic::{AtomicBool, Ordering};
use psx_bus::{
    AbortSignal, AckMode, BusConfig, ButtonChannel, PadSettings, Telemetry,
};
use psx_pad_bsp::priority::{ABORT_PRIORITY, TASK_PRIORITY};
use psx_pad_icd::DeviceInfo;
use static_cell::StaticCell;
use storage::SettingsStore;

pub const HW_VERSION: &str = env!("HW_VERSION");
pub const FW_VERSION: &str = env!("FW_VERSION");
pub const MANUFACTURER: &str = "psx-pad";

const SETTINGS_BUF_SZ: usize = 64;
pub type AppSettingsStore = SettingsStore<
    embassy_embedded_hal::adapter::BlockingAsync<
        embassy_nrf::nvmc::Nvmc<'static>,
    >,
    SETTINGS_BUF_SZ,
>;

// State shared with the protocol context. Lock-free so that thread mode
// never waits on an executor.
pub static ABORT: AbortSignal = AbortSignal::new();
pub static BUTTONS: ButtonChannel = ButtonChannel::new(true);
pub static TELEMETRY: Telemetry = Telemetry::new();
pub static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

/// Timing of the controller bus.
pub fn bus_config() -> BusConfig {
    BusConfig::default()
}

/// Make `settings` take effect without a restart.
pub fn apply_settings(settings: &PadSettings) {
    BUTTONS.set_latching(settings.latching);
    DEBUG_MODE.store(settings.debug, Ordering::Release);
}

pub fn debug_mode() -> bool {
    DEBUG_MODE.load(Ordering::Acquire)
}

pub struct AppContext {
    pub device_info: DeviceInfo,
    pub settings_store: AppSettingsStore,
    pub ack_mode: AckMode,
}

impl AppContext {
    /// Persist `settings` and apply them. Returns whether the write
    /// succeeded; nothing changes on failure.
    pub async fn save_settings(&mut self, settings: PadSettings) -> bool {
        match self.settings_store.save(settings).await {
            Ok(_) => {
                apply_settings(&settings);
                info!("Settings saved: {:?}", settings);
                true
            }
            Err(e) => {
                warn!("Failed to save settings: {:?}", e);
                false
            }
        }
    }
}

// Statics
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_MED: InterruptExecutor = InterruptExecutor::new();
pub static APP_CONTEXT: StaticCell<
    Mutex<CriticalSectionRawMutex, AppContext>,
> = StaticCell::new();

// Interrupt executors
#[interrupt]
unsafe fn EGU0_SWI0() {
    EXECUTOR_MED.on_interrupt()
}

#[interrupt]
unsafe fn EGU1_SWI1() {
    EXECUTOR_HIGH.on_interrupt()
}

pub fn init_executors() -> (SendSpawner, SendSpawner) {
    // Medium-priority executor: EGU0_SWI0, held off during transactions
    interrupt::EGU0_SWI0.set_priority(TASK_PRIORITY);
    let medium_prio_spawner = EXECUTOR_MED.start(interrupt::EGU0_SWI0);

    // High-priority executor: EGU1_SWI1, above the transaction mask
    interrupt::EGU1_SWI1.set_priority(ABORT_PRIORITY);
    let high_prio_spawner = EXECUTOR_HIGH.start(interrupt::EGU1_SWI1);
    (medium_prio_spawner, high_prio_spawner)
}

pub mod prelude {
    pub use super::{
        apply_settings, bus_config, debug, debug_mode, error, info,
        init_executors, storage::*, tasks::*, unwrap, warn, AppContext,
        AppSettingsStore, ABORT, APP_CONTEXT, BUTTONS, FW_VERSION,
        HW_VERSION, MANUFACTURER, TELEMETRY,
    };
    pub use embassy_executor::Spawner;
    pub use embassy_nrf::interrupt;
    pub use embassy_nrf::interrupt::{InterruptExt, Priority};
    pub use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    pub use embassy_sync::mutex::Mutex;
    pub use embassy_time::{Duration, Instant, Ticker, Timer};

    pub use psx_pad_bsp::priority::TransactionGuard;
    pub use psx_pad_bsp::{BusLines, ButtonBank, CycleTimebase, PsxPad};
    pub use psx_pad_icd::{self as icd, *};
}
