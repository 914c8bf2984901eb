use crate::error::BusError;

/// Time source for the protocol context.
pub trait Timebase {
    /// Free-running, wrapping counter used for edge timeouts and busy delays.
    fn ticks(&self) -> u32;

    /// Resolution of [`ticks`](Self::ticks).
    fn ticks_per_us(&self) -> u32;

    /// Monotonic microseconds, used for bookkeeping over long horizons
    /// (poll intervals, calibration windows).
    fn now_us(&self) -> u64;

    /// Busy-wait for `us` microseconds. Never yields.
    fn delay_us(&self, us: u32) {
        let start = self.ticks();
        let span = us.saturating_mul(self.ticks_per_us());
        while self.ticks().wrapping_sub(start) < span {
            core::hint::spin_loop();
        }
    }
}

impl<T: Timebase + ?Sized> Timebase for &T {
    fn ticks(&self) -> u32 {
        (**self).ticks()
    }
    fn ticks_per_us(&self) -> u32 {
        (**self).ticks_per_us()
    }
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
    fn delay_us(&self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Spin until `condition` holds.
///
/// Gives up with [`BusError::Aborted`] as soon as `aborted` reports true, or
/// with [`BusError::Timeout`] once more than `timeout_us` has elapsed. The
/// condition is always checked first, so an edge that lands together with
/// the deadline still counts.
#[inline(always)]
pub fn poll_until<T: Timebase + ?Sized>(
    time: &T,
    timeout_us: u32,
    mut condition: impl FnMut() -> bool,
    mut aborted: impl FnMut() -> bool,
) -> Result<(), BusError> {
    let start = time.ticks();
    let limit = timeout_us.saturating_mul(time.ticks_per_us());
    loop {
        if condition() {
            return Ok(());
        }
        if time.ticks().wrapping_sub(start) > limit {
            return Err(BusError::Timeout);
        }
        if aborted() {
            return Err(BusError::Aborted);
        }
    }
}
