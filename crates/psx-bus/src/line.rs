/// Drive state of an open-drain bus line.
///
/// The data and acknowledge lines are pulled up by the host. The device can
/// only pull them low or let go, so there is deliberately no `High` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineState {
    /// High-impedance; the external pull-up defines the level.
    #[default]
    Released,
    /// Actively pulled to ground.
    DrivenLow,
}

impl LineState {
    /// Line state that puts `bit` on the wire (`1` = released, `0` = low).
    #[inline(always)]
    pub const fn for_bit(bit: bool) -> Self {
        if bit {
            Self::Released
        } else {
            Self::DrivenLow
        }
    }
}

/// Access to the five controller bus lines.
///
/// All methods take `&self`: the abort path must be able to release the
/// lines while the protocol context is in the middle of a transfer.
/// Implementations must make `set_data`/`set_ack` single, atomic register
/// writes.
pub trait PadBus {
    /// `true` while select is deasserted (no transaction).
    fn select_high(&self) -> bool;
    fn clock_high(&self) -> bool;
    fn command_high(&self) -> bool;
    fn set_data(&self, state: LineState);
    fn set_ack(&self, state: LineState);

    /// Return both bidirectional lines to high-impedance.
    ///
    /// Idempotent and callable from any context.
    #[inline(always)]
    fn release(&self) {
        self.set_data(LineState::Released);
        self.set_ack(LineState::Released);
    }
}

impl<T: PadBus + ?Sized> PadBus for &T {
    fn select_high(&self) -> bool {
        (**self).select_high()
    }
    fn clock_high(&self) -> bool {
        (**self).clock_high()
    }
    fn command_high(&self) -> bool {
        (**self).command_high()
    }
    fn set_data(&self, state: LineState) {
        (**self).set_data(state)
    }
    fn set_ack(&self, state: LineState) {
        (**self).set_ack(state)
    }
}
