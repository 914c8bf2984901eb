#![no_std]
#![no_main]

use embassy_executor::Spawner;
use static_cell::StaticCell;

#[cfg(feature = "defmt")]
use defmt_rtt as _;
#[cfg(feature = "defmt")]
use panic_probe as _;
#[cfg(not(feature = "defmt"))]
use panic_reset as _;

use psx_bus::Engine;
use psx_pad_app::prelude::*;

static BUS_LINES: StaticCell<BusLines> = StaticCell::new();

// Application main entry point. Everything but the protocol loop runs on
// the interrupt executors. The loop owns thread mode from the end of this
// function on and masks the task executor while a transaction is running.
#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("psx-pad {} ({})", FW_VERSION, HW_VERSION);
    // First we initialize our board.
    let board = PsxPad::default();

    // Create our settings store and apply what it holds.
    let flash = embassy_embedded_hal::adapter::BlockingAsync::new(
        embassy_nrf::nvmc::Nvmc::new(board.nvmc),
    );
    let settings_store = AppSettingsStore::new(flash);
    apply_settings(&settings_store.settings());

    let bus_config = bus_config();
    let (lines, select) = BusLines::new(board.bus);
    let lines: &'static BusLines = BUS_LINES.init(lines);
    let timebase = CycleTimebase::new(board.dcb, board.dwt);
    let buttons = ButtonBank::new(board.buttons);

    let (medium_prio_spawner, high_prio_spawner) = init_executors();

    let app_context = APP_CONTEXT.init(Mutex::new(AppContext {
        device_info: DeviceInfo {
            hardware_revision: heapless::String::try_from(HW_VERSION).unwrap(),
            software_revision: heapless::String::try_from(FW_VERSION).unwrap(),
            manufacturer_name: heapless::String::try_from(MANUFACTURER).unwrap(),
        },
        settings_store,
        ack_mode: bus_config.ack,
    }));

    high_prio_spawner.must_spawn(select_abort_task(select, lines));

    medium_prio_spawner.must_spawn(watchdog_task(board.wdt));
    medium_prio_spawner.must_spawn(sampling_task(buttons));
    medium_prio_spawner.must_spawn(status_led_task(board.led.into()));
    medium_prio_spawner.must_spawn(telemetry_task());

    #[cfg(feature = "usb")]
    medium_prio_spawner.must_spawn(usb_task(board.usb, app_context));
    #[cfg(not(feature = "usb"))]
    let _ = app_context;

    info!("System ready. Waiting for the console...");

    let mut engine = Engine::new(
        lines,
        &timebase,
        &ABORT,
        &BUTTONS,
        &TELEMETRY,
        bus_config,
    )
    .with_guard(TransactionGuard);
    engine.run()
}
