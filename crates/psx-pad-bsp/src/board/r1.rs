use cortex_m::peripheral::{DCB, DWT};
use embassy_nrf::peripherals::{
    self, NVMC, P0_03, P0_04, P0_13, P0_28, P0_29, P0_30, WDT,
};
use embassy_nrf::Peri;

use crate::priority::{GPIOTE_PRIORITY, TIME_PRIORITY};
#[cfg(feature = "usb")]
use crate::usb;

/// The five controller port lines.
pub struct BusResources {
    /// Data, device to console. Open-drain.
    pub dat: Peri<'static, P0_03>,
    /// Command, console to device.
    pub cmd: Peri<'static, P0_04>,
    /// Select ("attention"), active low.
    pub sel: Peri<'static, P0_28>,
    /// Clock, idles high.
    pub clk: Peri<'static, P0_29>,
    /// Acknowledge, device to console. Open-drain.
    pub ack: Peri<'static, P0_30>,
}

/// Discrete button inputs, wired to ground.
pub struct ButtonResources {
    pub select: Peri<'static, peripherals::P1_11>,
    pub start: Peri<'static, peripherals::P1_10>,
    pub up: Peri<'static, peripherals::P0_11>,
    pub right: Peri<'static, peripherals::P0_25>,
    pub down: Peri<'static, peripherals::P0_12>,
    pub left: Peri<'static, peripherals::P0_24>,
    pub l2: Peri<'static, peripherals::P1_07>,
    pub r2: Peri<'static, peripherals::P1_08>,
    pub l1: Peri<'static, peripherals::P1_05>,
    pub r1: Peri<'static, peripherals::P1_06>,
    pub triangle: Peri<'static, peripherals::P1_03>,
    pub circle: Peri<'static, peripherals::P1_01>,
    pub cross: Peri<'static, peripherals::P1_02>,
    pub square: Peri<'static, peripherals::P1_04>,
}

/// Represents all the peripherals and pins available on the pad adapter.
pub struct PsxPad {
    /// Controller port.
    pub bus: BusResources,
    /// Button inputs.
    pub buttons: ButtonResources,
    /// Status LED, active low.
    pub led: Peri<'static, P0_13>,
    /// Debug control block, needed to start the cycle counter.
    pub dcb: DCB,
    /// Data watchpoint and trace unit, home of the cycle counter.
    pub dwt: DWT,
    /// Watchdog Timer.
    pub wdt: Peri<'static, WDT>,
    /// Non-Volatile Memory Controller.
    pub nvmc: Peri<'static, NVMC>,
    #[cfg(feature = "usb")]
    /// USB device peripheral
    pub usb: usb::UsbDriverBuilder,
}

impl Default for PsxPad {
    fn default() -> Self {
        let mut config = embassy_nrf::config::Config::default();
        config.hfclk_source = embassy_nrf::config::HfclkSource::ExternalXtal;
        config.gpiote_interrupt_priority = GPIOTE_PRIORITY;
        config.time_interrupt_priority = TIME_PRIORITY;
        Self::new(config)
    }
}

impl PsxPad {
    /// Create a new instance based on HAL configuration
    pub fn new(config: embassy_nrf::config::Config) -> Self {
        let p = embassy_nrf::init(config);
        let core = cortex_m::Peripherals::take()
            .expect("core peripherals taken before board init");

        Self {
            bus: BusResources {
                dat: p.P0_03,
                cmd: p.P0_04,
                sel: p.P0_28,
                clk: p.P0_29,
                ack: p.P0_30,
            },
            buttons: ButtonResources {
                select: p.P1_11,
                start: p.P1_10,
                up: p.P0_11,
                right: p.P0_25,
                down: p.P0_12,
                left: p.P0_24,
                l2: p.P1_07,
                r2: p.P1_08,
                l1: p.P1_05,
                r1: p.P1_06,
                triangle: p.P1_03,
                circle: p.P1_01,
                cross: p.P1_02,
                square: p.P1_04,
            },
            led: p.P0_13,
            dcb: core.DCB,
            dwt: core.DWT,
            wdt: p.WDT,
            nvmc: p.NVMC,
            #[cfg(feature = "usb")]
            usb: usb::UsbDriverBuilder::new(p.USBD),
        }
    }
}
