use crate::board::{BusResources, ButtonResources};
use cortex_m::peripheral::{DCB, DWT};
use embassy_nrf::gpio::{Flex, Input, OutputDrive, Pin, Port, Pull};
use embassy_nrf::{pac, Peri};
use psx_bus::{Button, ButtonSnapshot, LineState, PadBus, Timebase};

/// Core clock, and with it the cycle counter rate.
pub const CPU_MHZ: u32 = 64;

/// A pin addressed through its port registers.
#[derive(Clone, Copy)]
struct RawLine {
    regs: pac::gpio::Gpio,
    pin: usize,
}

impl RawLine {
    fn of(pin: &Peri<'static, impl Pin>) -> Self {
        let regs = match pin.port() {
            Port::Port0 => pac::P0,
            Port::Port1 => pac::P1,
        };
        Self { regs, pin: pin.pin() as usize }
    }

    #[inline(always)]
    fn is_high(&self) -> bool {
        self.regs.in_().read().pin(self.pin)
    }

    /// With `S0D1` drive a set output bit disconnects the pin.
    #[inline(always)]
    fn set(&self, state: LineState) {
        match state {
            LineState::Released => {
                self.regs.outset().write(|w| w.set_pin(self.pin, true))
            }
            LineState::DrivenLow => {
                self.regs.outclr().write(|w| w.set_pin(self.pin, true))
            }
        }
    }
}

fn open_drain(pin: Peri<'static, impl Pin>) -> (Flex<'static>, RawLine) {
    let raw = RawLine::of(&pin);
    let mut flex = Flex::new(pin);
    flex.set_high();
    flex.set_as_input_output(Pull::None, OutputDrive::Standard0Disconnect1);
    (flex, raw)
}

/// Controller port lines as seen by the protocol engine.
///
/// Every accessor is a single register access so the lines can be shared
/// between thread mode and the select interrupt.
pub struct BusLines {
    dat: RawLine,
    ack: RawLine,
    cmd: RawLine,
    sel: RawLine,
    clk: RawLine,
    _pins: (Flex<'static>, Flex<'static>, Input<'static>, Input<'static>),
}

impl BusLines {
    /// Configure the port and split off the select input for edge
    /// detection.
    pub fn new(res: BusResources) -> (Self, Input<'static>) {
        let (dat_pin, dat) = open_drain(res.dat);
        let (ack_pin, ack) = open_drain(res.ack);
        let cmd = RawLine::of(&res.cmd);
        let clk = RawLine::of(&res.clk);
        let sel = RawLine::of(&res.sel);

        let lines = Self {
            dat,
            ack,
            cmd,
            sel,
            clk,
            _pins: (
                dat_pin,
                ack_pin,
                Input::new(res.cmd, Pull::None),
                Input::new(res.clk, Pull::None),
            ),
        };
        (lines, Input::new(res.sel, Pull::None))
    }
}

impl PadBus for BusLines {
    #[inline(always)]
    fn select_high(&self) -> bool {
        self.sel.is_high()
    }

    #[inline(always)]
    fn clock_high(&self) -> bool {
        self.clk.is_high()
    }

    #[inline(always)]
    fn command_high(&self) -> bool {
        self.cmd.is_high()
    }

    #[inline(always)]
    fn set_data(&self, state: LineState) {
        self.dat.set(state)
    }

    #[inline(always)]
    fn set_ack(&self, state: LineState) {
        self.ack.set(state)
    }
}

/// Cycle-accurate timebase on the DWT counter.
pub struct CycleTimebase {
    _dwt: DWT,
}

impl CycleTimebase {
    pub fn new(mut dcb: DCB, mut dwt: DWT) -> Self {
        dcb.enable_trace();
        dwt.set_cycle_count(0);
        dwt.enable_cycle_counter();
        Self { _dwt: dwt }
    }
}

impl Timebase for CycleTimebase {
    #[inline(always)]
    fn ticks(&self) -> u32 {
        DWT::cycle_count()
    }

    #[inline(always)]
    fn ticks_per_us(&self) -> u32 {
        CPU_MHZ
    }

    fn now_us(&self) -> u64 {
        embassy_time::Instant::now().as_micros()
    }
}

/// The fourteen button inputs.
pub struct ButtonBank {
    inputs: [(Button, Input<'static>); 14],
}

impl ButtonBank {
    pub fn new(res: ButtonResources) -> Self {
        Self {
            inputs: [
                (Button::Select, Input::new(res.select, Pull::Up)),
                (Button::Start, Input::new(res.start, Pull::Up)),
                (Button::Up, Input::new(res.up, Pull::Up)),
                (Button::Right, Input::new(res.right, Pull::Up)),
                (Button::Down, Input::new(res.down, Pull::Up)),
                (Button::Left, Input::new(res.left, Pull::Up)),
                (Button::L2, Input::new(res.l2, Pull::Up)),
                (Button::R2, Input::new(res.r2, Pull::Up)),
                (Button::L1, Input::new(res.l1, Pull::Up)),
                (Button::R1, Input::new(res.r1, Pull::Up)),
                (Button::Triangle, Input::new(res.triangle, Pull::Up)),
                (Button::Circle, Input::new(res.circle, Pull::Up)),
                (Button::Cross, Input::new(res.cross, Pull::Up)),
                (Button::Square, Input::new(res.square, Pull::Up)),
            ],
        }
    }

    /// Read every input once. A low pin is a pressed button.
    pub fn sample(&self) -> ButtonSnapshot {
        ButtonSnapshot::from_pressed(
            self.inputs
                .iter()
                .filter(|(_, input)| input.is_low())
                .map(|(button, _)| *button),
        )
    }
}
