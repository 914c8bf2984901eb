//! Interrupt priorities of the adapter.
//!
//! The protocol loop runs in thread mode. While a transaction is on the wire
//! [`TransactionGuard`] masks every interrupt at [`TRANSACTION_MASK`] or
//! below, so only the select edge and the abort executor can preempt it.

use cortex_m::register::basepri;
use embassy_nrf::interrupt::Priority;
use psx_bus::PreemptionGuard;

/// GPIOTE, which reports the select rising edge.
pub const GPIOTE_PRIORITY: Priority = Priority::P1;
/// Executor running the select abort task.
pub const ABORT_PRIORITY: Priority = Priority::P2;
/// Highest priority held off during a transaction.
pub const TRANSACTION_MASK: Priority = Priority::P3;
/// RTC1 time driver.
pub const TIME_PRIORITY: Priority = Priority::P3;
/// USBD and POWER.
pub const USB_PRIORITY: Priority = Priority::P4;
/// Executor running sampling, status, telemetry and the console.
pub const TASK_PRIORITY: Priority = Priority::P7;

/// Raises BASEPRI to [`TRANSACTION_MASK`] for the length of a transaction.
#[derive(Clone, Copy, Default)]
pub struct TransactionGuard;

impl PreemptionGuard for TransactionGuard {
    type Saved = u8;

    #[inline(always)]
    fn hold(&self) -> u8 {
        let saved = basepri::read();
        let mask = u8::from(TRANSACTION_MASK);
        // BASEPRI of zero masks nothing; otherwise only ever raise it.
        if saved == 0 || saved > mask {
            // SAFETY: BASEPRI only masks interrupts. Nothing in thread mode
            // relies on them being taken during a transaction.
            unsafe { basepri::write(mask) };
        }
        saved
    }

    #[inline(always)]
    fn restore(&self, saved: u8) {
        // SAFETY: puts back the value read in `hold`.
        unsafe { basepri::write(saved) };
    }
}
