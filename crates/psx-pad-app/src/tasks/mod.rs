use crate::prelude::*;
use embassy_nrf::peripherals::WDT;
use embassy_nrf::wdt;
use embassy_nrf::wdt::Watchdog;
use embassy_nrf::Peri;

pub mod sampling;
pub mod select;
pub mod status_led;
pub mod telemetry;

#[cfg(feature = "usb")]
pub mod usb;

// Re-exports
pub use sampling::*;
pub use select::*;
pub use status_led::*;
pub use telemetry::*;
#[cfg(feature = "usb")]
pub use usb::*;

// Keeps our system alive
#[embassy_executor::task]
pub async fn watchdog_task(wdt: Peri<'static, WDT>) {
    let wdt_config = unwrap!(wdt::Config::try_new(&wdt));
    let (_wdt, [mut handle]) = match Watchdog::try_new(wdt, wdt_config) {
        Ok(x) => x,
        Err(_) => {
            // Watchdog already active with the wrong number of handles, waiting for it to timeout...
            loop {
                cortex_m::asm::wfe();
            }
        }
    };
    loop {
        handle.pet();
        Timer::after(Duration::from_secs(2)).await;
    }
}
