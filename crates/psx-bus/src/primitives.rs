use crate::error::BusError;
use crate::line::{LineState, PadBus};
use crate::time::{poll_until, Timebase};

/// Acknowledge pulse shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckTiming {
    /// Wait between the last clock edge and asserting acknowledge.
    pub delay_us: u32,
    /// How long acknowledge is held low.
    pub pulse_us: u32,
}

/// Bit-level access to the controller bus.
///
/// Every operation is bounded: edge waits give up after their timeout or as
/// soon as select is released, and every exit path leaves the data line
/// released.
pub struct BusDriver<'a, B: PadBus, T: Timebase> {
    bus: &'a B,
    time: &'a T,
    byte_timeout_us: u32,
    edge_timeout_us: u32,
}

impl<'a, B: PadBus, T: Timebase> BusDriver<'a, B, T> {
    pub const fn new(
        bus: &'a B,
        time: &'a T,
        byte_timeout_us: u32,
        edge_timeout_us: u32,
    ) -> Self {
        Self { bus, time, byte_timeout_us, edge_timeout_us }
    }

    #[inline(always)]
    pub fn bus(&self) -> &'a B {
        self.bus
    }

    #[inline(always)]
    pub fn time(&self) -> &'a T {
        self.time
    }

    /// Wait for clock to go high.
    #[inline(always)]
    pub fn wait_rising(&self, timeout_us: u32) -> Result<(), BusError> {
        let bus = self.bus;
        poll_until(
            self.time,
            timeout_us,
            || bus.clock_high(),
            || bus.select_high(),
        )
    }

    /// Wait for clock to go low.
    #[inline(always)]
    pub fn wait_falling(&self, timeout_us: u32) -> Result<(), BusError> {
        let bus = self.bus;
        poll_until(
            self.time,
            timeout_us,
            || !bus.clock_high(),
            || bus.select_high(),
        )
    }

    /// The first edge of a byte may take longer to come than the following
    /// ones, since the host is free to pause between bytes.
    #[inline(always)]
    fn falling_timeout(&self, bit: u8) -> u32 {
        if bit == 0 {
            self.byte_timeout_us
        } else {
            self.edge_timeout_us
        }
    }

    /// Receive one byte from the command line, LSB first, sampling on each
    /// rising clock edge. The data line is not touched.
    pub fn receive_byte(&self) -> Result<u8, BusError> {
        let mut value = 0u8;
        for bit in 0..8 {
            self.wait_falling(self.falling_timeout(bit))?;
            self.wait_rising(self.edge_timeout_us)?;
            if self.bus.command_high() {
                value |= 1 << bit;
            }
        }
        Ok(value)
    }

    /// Send one byte on the data line, LSB first, changing the line right
    /// after each falling clock edge.
    pub fn send_byte(&self, value: u8) -> Result<(), BusError> {
        let result = self.send_bits(value);
        self.bus.set_data(LineState::Released);
        result
    }

    fn send_bits(&self, value: u8) -> Result<(), BusError> {
        for bit in 0..8 {
            self.wait_falling(self.falling_timeout(bit))?;
            self.bus.set_data(LineState::for_bit(value & (1 << bit) != 0));
            self.wait_rising(self.edge_timeout_us)?;
        }
        Ok(())
    }

    /// Full-duplex byte exchange.
    ///
    /// The command bit is sampled right after the falling edge, before the
    /// data line is changed; the outgoing bit then stays on the line for the
    /// host to sample on the following rising edge.
    pub fn transfer_byte(&self, out: u8) -> Result<u8, BusError> {
        let result = self.transfer_bits(out);
        self.bus.set_data(LineState::Released);
        result
    }

    fn transfer_bits(&self, out: u8) -> Result<u8, BusError> {
        let mut value = 0u8;
        for bit in 0..8 {
            self.wait_falling(self.falling_timeout(bit))?;
            let incoming = self.bus.command_high();
            self.bus.set_data(LineState::for_bit(out & (1 << bit) != 0));
            self.wait_rising(self.edge_timeout_us)?;
            if incoming {
                value |= 1 << bit;
            }
        }
        Ok(value)
    }

    /// Pulse the acknowledge line low.
    pub fn send_ack(&self, timing: AckTiming) {
        if timing.delay_us > 0 {
            self.time.delay_us(timing.delay_us);
        }
        self.bus.set_ack(LineState::DrivenLow);
        self.time.delay_us(timing.pulse_us);
        self.bus.set_ack(LineState::Released);
    }

    /// Release data and acknowledge. Safe to call at any time.
    #[inline(always)]
    pub fn release_bus(&self) {
        self.bus.release();
    }
}
