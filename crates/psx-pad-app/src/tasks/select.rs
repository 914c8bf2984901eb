use crate::prelude::*;
use embassy_nrf::gpio::Input;

/// Cuts a transaction short the moment the console deselects us.
///
/// Runs on the high-priority executor so that it preempts the protocol
/// loop in thread mode.
#[embassy_executor::task]
pub async fn select_abort_task(
    mut select: Input<'static>,
    lines: &'static BusLines,
) {
    loop {
        select.wait_for_rising_edge().await;
        ABORT.on_select_rising(lines);
    }
}
