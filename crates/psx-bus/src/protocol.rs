use crate::abort::AbortSignal;
use crate::calibrator::{CalibrationEvent, CalibrationStatus, Calibrator};
use crate::channel::ButtonChannel;
use crate::config::{AckMode, BusConfig};
use crate::error::BusError;
use crate::guard::{PreemptionGuard, Unguarded};
use crate::line::{LineState, PadBus};
use crate::primitives::{AckTiming, BusDriver};
use crate::stats::{IntervalTracker, Telemetry};
use crate::time::Timebase;

/// Address of a controller in port 1.
pub const ADDR_CONTROLLER: u8 = 0x01;
/// Address of a memory card in port 1.
pub const ADDR_MEMORY_CARD: u8 = 0x81;
/// Read buttons.
pub const CMD_POLL: u8 = 0x42;
/// Identification of a digital pad, sent while the command byte comes in.
pub const ID_DIGITAL_LO: u8 = 0x41;
pub const ID_DIGITAL_HI: u8 = 0x5A;
/// What a silent command line reads as.
pub const SENTINEL: u8 = 0xFF;
/// Addresses of other known devices that are left alone without being
/// counted as invalid: multitap, DVD remote receiver and the two
/// configuration-mode headers.
pub const IGNORED_ADDRESSES: [u8; 4] = [0x21, 0x61, 0x43, 0x4D];

/// Select reads between two looks at the clock for calibration idle time.
const IDLE_CHECK_SPINS: u32 = 1024;

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Full poll response sent.
    Polled,
    /// Addressed, but the command is not poll. Nothing more was sent.
    Unsupported(u8),
    /// Memory card access, sat out silently.
    MemoryCard,
    /// Known foreign device address.
    Ignored(u8),
    /// Unknown address.
    Invalid(u8),
    /// Timed out or aborted by the host.
    Failed(BusError),
}

enum AckSource {
    Fixed { pulse_us: u8, post_wait_us: u8 },
    Calibrated(Calibrator),
}

/// The transaction state machine.
///
/// Owns everything the protocol context mutates; shares the abort signal
/// with the select interrupt, the button channel with the sampling context
/// and the telemetry with whoever wants to read it. On a single core the
/// guard from [`with_guard`](Self::with_guard) keeps everything but the
/// abort path off the CPU while a transaction is on the wire.
pub struct Engine<'a, B: PadBus, T: Timebase, G: PreemptionGuard = Unguarded>
{
    driver: BusDriver<'a, B, T>,
    guard: G,
    abort: &'a AbortSignal,
    channel: &'a ButtonChannel,
    telemetry: &'a Telemetry,
    config: BusConfig,
    ack: AckSource,
    intervals: IntervalTracker,
    events: [Option<CalibrationEvent>; 2],
}

impl<'a, B: PadBus, T: Timebase> Engine<'a, B, T> {
    pub fn new(
        bus: &'a B,
        time: &'a T,
        abort: &'a AbortSignal,
        channel: &'a ButtonChannel,
        telemetry: &'a Telemetry,
        config: BusConfig,
    ) -> Self {
        let ack = match config.ack {
            AckMode::Fixed { pulse_us, post_wait_us } => {
                AckSource::Fixed { pulse_us, post_wait_us }
            }
            AckMode::Calibrated(calibration) => {
                AckSource::Calibrated(Calibrator::new(calibration))
            }
        };
        bus.release();
        let engine = Self {
            driver: BusDriver::new(
                bus,
                time,
                config.byte_timeout_us,
                config.edge_timeout_us,
            ),
            guard: Unguarded,
            abort,
            channel,
            telemetry,
            config,
            ack,
            intervals: IntervalTracker::default(),
            events: [None; 2],
        };
        telemetry.publish_calibration(engine.calibration());
        engine
    }

    /// Hold off other contexts with `guard` for every transaction.
    pub fn with_guard<G: PreemptionGuard>(
        self,
        guard: G,
    ) -> Engine<'a, B, T, G> {
        Engine {
            driver: self.driver,
            guard,
            abort: self.abort,
            channel: self.channel,
            telemetry: self.telemetry,
            config: self.config,
            ack: self.ack,
            intervals: self.intervals,
            events: self.events,
        }
    }
}

impl<'a, B: PadBus, T: Timebase, G: PreemptionGuard> Engine<'a, B, T, G> {
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Current acknowledge parameters. A fixed configuration reports itself
    /// as locked.
    pub fn calibration(&self) -> CalibrationStatus {
        match &self.ack {
            AckSource::Fixed { pulse_us, post_wait_us } => CalibrationStatus {
                pulse_us: *pulse_us,
                post_wait_us: *post_wait_us,
                locked: true,
                started: true,
            },
            AckSource::Calibrated(calibrator) => calibrator.snapshot(),
        }
    }

    /// Serve transactions forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.service();
        }
    }

    /// Wait for the next transaction and serve it.
    pub fn service(&mut self) -> Outcome {
        self.wait_for_select();
        let saved = self.guard.hold();
        self.telemetry.apply_requests(&mut self.intervals);

        self.abort.begin();
        let outcome = match self.transaction() {
            Ok(outcome) => outcome,
            Err(e) => {
                if e == BusError::Timeout {
                    self.telemetry.record_timeout();
                }
                Outcome::Failed(e)
            }
        };
        self.driver.release_bus();
        self.guard.restore(saved);

        if outcome == Outcome::MemoryCard {
            self.sit_out();
        }
        self.abort.end();

        self.report(outcome);
        outcome
    }

    /// Spin until select goes from high to low and stays low past the
    /// debounce time.
    fn wait_for_select(&mut self) {
        let bus = self.driver.bus();
        let mut spins = 0u32;
        loop {
            while !bus.select_high() {
                self.idle_spin(&mut spins);
            }
            while bus.select_high() {
                self.idle_spin(&mut spins);
            }
            self.driver.time().delay_us(self.config.debounce_us);
            if !bus.select_high() {
                return;
            }
        }
    }

    #[inline(always)]
    fn idle_spin(&mut self, spins: &mut u32) {
        *spins += 1;
        if *spins >= IDLE_CHECK_SPINS {
            *spins = 0;
            self.check_idle();
        }
        core::hint::spin_loop();
    }

    /// Let the calibrator notice a host that stopped talking.
    fn check_idle(&mut self) {
        let AckSource::Calibrated(calibrator) = &mut self.ack else {
            return;
        };
        let now = self.driver.time().now_us();
        if let Some(CalibrationEvent::IdleReset) = calibrator.poll_idle(now) {
            self.telemetry.publish_calibration(calibrator.snapshot());
            info!("host idle, ack calibration reset");
        }
    }

    /// Stay off the bus until select rises, without holding anyone off.
    fn sit_out(&self) {
        let bus = self.driver.bus();
        while !bus.select_high() && self.abort.is_active() {
            core::hint::spin_loop();
        }
    }

    /// The transaction is still ours.
    #[inline(always)]
    fn checkpoint(&self) -> Result<(), BusError> {
        if !self.abort.is_active() || self.driver.bus().select_high() {
            return Err(BusError::Aborted);
        }
        Ok(())
    }

    fn pulse_us(&self) -> u32 {
        match &self.ack {
            AckSource::Fixed { pulse_us, .. } => *pulse_us as u32,
            AckSource::Calibrated(calibrator) => calibrator.pulse_us() as u32,
        }
    }

    fn post_wait_us(&self) -> u32 {
        match &self.ack {
            AckSource::Fixed { post_wait_us, .. } => *post_wait_us as u32,
            AckSource::Calibrated(calibrator) => {
                calibrator.post_wait_us() as u32
            }
        }
    }

    /// Acknowledge the byte just transferred with the abort interrupt held
    /// off, dropping any select edge raised meanwhile.
    #[inline(always)]
    fn acknowledge(&self) {
        let timing = AckTiming {
            delay_us: self.config.ack_delay_us,
            pulse_us: self.pulse_us(),
        };
        self.abort.mask();
        self.driver.send_ack(timing);
        self.abort.unmask();
    }

    fn calibrate(
        &mut self,
        observe: impl FnOnce(&mut Calibrator) -> Option<CalibrationEvent>,
    ) {
        if let AckSource::Calibrated(calibrator) = &mut self.ack {
            if let Some(event) = observe(calibrator) {
                let slot = if self.events[0].is_none() { 0 } else { 1 };
                self.events[slot] = Some(event);
            }
        }
    }

    fn transaction(&mut self) -> Result<Outcome, BusError> {
        let address = self.driver.receive_byte()?;
        self.checkpoint()?;
        if address == SENTINEL {
            return Err(BusError::Timeout);
        }

        let now = self.driver.time().now_us();
        self.telemetry.record_transaction(now);

        match address {
            ADDR_CONTROLLER => self.controller(),
            ADDR_MEMORY_CARD => {
                self.telemetry.record_memory_card();
                self.driver.release_bus();
                Ok(Outcome::MemoryCard)
            }
            a if IGNORED_ADDRESSES.contains(&a) => Ok(Outcome::Ignored(a)),
            a => {
                self.telemetry.record_invalid_address(a);
                Ok(Outcome::Invalid(a))
            }
        }
    }

    fn controller(&mut self) -> Result<Outcome, BusError> {
        self.telemetry.record_controller();
        self.driver.bus().set_data(LineState::Released);

        self.acknowledge();
        if self.driver.bus().select_high() {
            return Err(BusError::Aborted);
        }

        let now = self.driver.time().now_us();
        self.calibrate(|c| c.on_address(now));
        self.driver.time().delay_us(self.post_wait_us());

        let command = self.driver.transfer_byte(ID_DIGITAL_LO);
        let arrived = matches!(command, Ok(c) if c != SENTINEL);
        self.calibrate(|c| c.on_command(arrived, now));

        let command = command?;
        if command == SENTINEL {
            return Err(BusError::Timeout);
        }
        self.checkpoint()?;

        if command != CMD_POLL {
            self.telemetry.record_invalid_command(command);
            return Ok(Outcome::Unsupported(command));
        }

        self.intervals.record(now, self.telemetry);
        let buttons = self.channel.read();

        let reply = [ID_DIGITAL_HI, buttons.buttons1, buttons.buttons2];
        for (i, byte) in reply.iter().enumerate() {
            self.acknowledge();
            self.checkpoint()?;
            self.driver.transfer_byte(*byte)?;
            // The last byte is never acknowledged and the host may release
            // select right after it.
            if i + 1 < reply.len() {
                self.checkpoint()?;
            }
        }
        Ok(Outcome::Polled)
    }

    /// Logging and telemetry that must wait until the bus is free.
    fn report(&mut self, outcome: Outcome) {
        for event in self.events.iter_mut().filter_map(Option::take) {
            match event {
                CalibrationEvent::NewBest(c) => debug!(
                    "ack candidate {}us/{}us at {}%",
                    c.pulse_us,
                    c.post_wait_us,
                    c.rate_pct()
                ),
                CalibrationEvent::Locked(c) => info!(
                    "ack timing locked: pulse {}us, post-wait {}us ({}%)",
                    c.pulse_us,
                    c.post_wait_us,
                    c.rate_pct()
                ),
                CalibrationEvent::Restarted => {
                    warn!("no usable ack timing found, sweeping again")
                }
                CalibrationEvent::IdleReset => {
                    info!("host idle, ack calibration reset")
                }
            }
        }
        if let AckSource::Calibrated(calibrator) = &self.ack {
            self.telemetry.publish_calibration(calibrator.snapshot());
        }

        match outcome {
            Outcome::Invalid(address) => {
                trace!("invalid address {=u8:#04x}", address)
            }
            Outcome::Unsupported(command) => {
                trace!("unsupported command {=u8:#04x}", command)
            }
            _ => {}
        }
    }
}
