use crate::prelude::*;
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive};
use embassy_nrf::Peri;
use psx_bus::{StatusPattern, StatusTracker};

/// How often the bus activity is checked.
const CHECK_INTERVAL_MS: u64 = 1;

/// Shows the bus status on the (active low) LED.
#[embassy_executor::task]
pub async fn status_led_task(led_pin: Peri<'static, AnyPin>) {
    let mut led = Output::new(led_pin, Level::High, OutputDrive::Standard);
    let mut tracker = StatusTracker::new();
    let mut pattern = StatusPattern::new(debug_mode());
    let mut ticker = Ticker::every(Duration::from_millis(CHECK_INTERVAL_MS));

    loop {
        ticker.next().await;
        let now = Instant::now().as_micros();
        let status = tracker.update(&TELEMETRY.snapshot(), now);
        pattern.set_debug(debug_mode());
        pattern.set_status(status);
        led.set_level(if pattern.level(now) { Level::Low } else { Level::High });
    }
}
