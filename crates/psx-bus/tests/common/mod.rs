#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use psx_bus::{AbortSignal, LineState, PadBus, PreemptionGuard, Timebase};

// ---------------------------------------------------------------------------
// Simulated console
// ---------------------------------------------------------------------------

/// Virtual time charged per line read.
const READ_NS: u64 = 20;
/// Virtual time charged per tick read.
const TICK_NS: u64 = 5;

/// Waveform parameters of the simulated console.
#[derive(Debug, Clone, Copy)]
pub struct HostTiming {
    pub bit_ns: u64,
    /// Select low to first clock edge.
    pub lead_ns: u64,
    /// Acknowledge released to next byte.
    pub gap_ns: u64,
    /// How long the console waits for an acknowledge.
    pub ack_window_ns: u64,
    /// Shortest pulse the console notices.
    pub min_ack_ns: u64,
    /// Last byte to select release.
    pub tail_ns: u64,
    /// Select high between transactions.
    pub idle_ns: u64,
    /// How long select stays low once the console stops clocking.
    pub stall_ns: u64,
}

impl Default for HostTiming {
    fn default() -> Self {
        Self {
            bit_ns: 4_000,
            lead_ns: 20_000,
            gap_ns: 60_000,
            ack_window_ns: 100_000,
            min_ack_ns: 1_000,
            tail_ns: 5_000,
            idle_ns: 1_000_000,
            stall_ns: 1_000_000,
        }
    }
}

/// One select-low period as the console plays it.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub bytes: Vec<u8>,
    /// Wait for an acknowledge after every byte but the last, giving up
    /// when none comes.
    pub require_ack: bool,
    /// Release select right after this many bytes.
    pub cut_after: Option<usize>,
    /// Stop clocking after this many acknowledged bytes.
    pub stall_after: Option<usize>,
    /// Select high before this exchange, instead of `idle_ns`.
    pub idle_before_ns: Option<u64>,
}

impl Exchange {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            require_ack: true,
            cut_after: None,
            stall_after: None,
            idle_before_ns: None,
        }
    }

    pub fn poll() -> Self {
        Self::new(&[0x01, 0x42, 0x00, 0x00, 0x00])
    }

    /// Played without waiting for acknowledges, like traffic meant for
    /// another device.
    pub fn unacknowledged(bytes: &[u8]) -> Self {
        Self { require_ack: false, ..Self::new(bytes) }
    }

    pub fn cut_after(mut self, bytes: usize) -> Self {
        self.cut_after = Some(bytes);
        self
    }

    pub fn stall_after(mut self, bytes: usize) -> Self {
        self.stall_after = Some(bytes);
        self
    }

    /// Keep the bus quiet for `idle_ns` before this exchange.
    pub fn after_idle(mut self, idle_ns: u64) -> Self {
        self.idle_before_ns = Some(idle_ns);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPulse {
    /// Bytes fully clocked when the pulse started.
    pub after_bytes: usize,
    pub width_ns: u64,
}

/// What the console saw during one exchange.
#[derive(Debug, Clone, Default)]
pub struct Record {
    /// Data line sampled on every rising clock edge.
    pub response: Vec<u8>,
    pub acks: Vec<AckPulse>,
    pub data_driven: bool,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle { fall_at: u64 },
    Byte { index: usize, start: u64, sampled: u32 },
    WaitAck { index: usize, since: u64, deadline: u64 },
    Ending { at: u64 },
    Done { since: u64 },
}

struct Inner {
    timing: HostTiming,
    now: u64,
    phase: Phase,
    queue: VecDeque<Exchange>,
    current: Option<Exchange>,
    records: Vec<Record>,
    shift: u8,
    /// Last command bit of the previous byte and until when the console
    /// keeps it on the line.
    command_hold: Option<(u64, bool)>,
    data: LineState,
    ack: LineState,
    ack_low_since: Option<u64>,
    stray_drive: bool,
}

impl Inner {
    fn record(&mut self) -> Option<&mut Record> {
        if self.current.is_some() {
            self.records.last_mut()
        } else {
            None
        }
    }

    fn bytes_done(&self) -> usize {
        match self.phase {
            Phase::Byte { index, .. } => index,
            Phase::WaitAck { index, .. } => index + 1,
            _ => self.records.last().map_or(0, |r| r.response.len()),
        }
    }

    fn next_exchange(&mut self, at: u64) {
        self.current = self.queue.pop_front();
        self.phase = match &self.current {
            Some(exchange) => Phase::Idle {
                fall_at: at
                    + exchange.idle_before_ns.unwrap_or(self.timing.idle_ns),
            },
            None => Phase::Done { since: at },
        };
    }

    fn byte_finished(&mut self, index: usize, rise: u64) {
        let value = self.shift;
        if let Some(record) = self.record() {
            record.response.push(value);
        }
        let Some(exchange) = self.current.as_ref() else {
            return;
        };
        let last_bit = exchange.bytes[index] & 0x80 != 0;
        self.command_hold = Some((rise + self.timing.bit_ns / 2, last_bit));
        let done = index + 1;
        self.phase = if exchange.cut_after == Some(done) {
            Phase::Ending { at: rise + 1_000 }
        } else if done == exchange.bytes.len() {
            Phase::Ending { at: rise + self.timing.tail_ns }
        } else if exchange.require_ack {
            Phase::WaitAck {
                index,
                since: rise,
                deadline: rise + self.timing.ack_window_ns,
            }
        } else {
            Phase::Byte {
                index: done,
                start: rise + self.timing.bit_ns / 2 + self.timing.gap_ns,
                sampled: 0,
            }
        };
    }

    /// Play the waveform up to `target`. Returns whether select rose.
    fn step_to(&mut self, target: u64) -> bool {
        let mut rose = false;
        loop {
            match self.phase {
                Phase::Idle { fall_at } if fall_at <= target => {
                    self.now = fall_at;
                    self.records.push(Record::default());
                    self.phase = Phase::Byte {
                        index: 0,
                        start: fall_at + self.timing.lead_ns,
                        sampled: 0,
                    };
                }
                Phase::Byte { index, start, sampled } => {
                    let rise = start
                        + sampled as u64 * self.timing.bit_ns
                        + self.timing.bit_ns / 2;
                    if rise > target {
                        break;
                    }
                    self.now = rise;
                    if sampled == 0 {
                        self.shift = 0;
                    }
                    if self.data == LineState::Released {
                        self.shift |= 1 << sampled;
                    }
                    if sampled == 7 {
                        self.byte_finished(index, rise);
                    } else {
                        self.phase =
                            Phase::Byte { index, start, sampled: sampled + 1 };
                    }
                }
                Phase::WaitAck { deadline, .. } if deadline <= target => {
                    self.now = deadline;
                    self.phase = Phase::Ending { at: deadline };
                }
                Phase::Ending { at } if at <= target => {
                    self.now = at;
                    rose = true;
                    self.next_exchange(at);
                }
                Phase::Done { since } => {
                    assert!(
                        target < since + 10_000_000,
                        "console script exhausted"
                    );
                    break;
                }
                _ => break,
            }
        }
        self.now = target;
        rose
    }

    fn select_high(&self) -> bool {
        matches!(self.phase, Phase::Idle { .. } | Phase::Done { .. })
    }

    /// Position within the current byte, if one is being clocked.
    fn bit_at(&self) -> Option<(usize, u64, u64)> {
        match self.phase {
            Phase::Byte { index, start, .. } if self.now >= start => {
                let offset = self.now - start;
                let bit = offset / self.timing.bit_ns;
                (bit < 8).then_some((index, bit, offset % self.timing.bit_ns))
            }
            _ => None,
        }
    }

    fn ack_released(&mut self) {
        let Some(since) = self.ack_low_since.take() else {
            return;
        };
        let width_ns = self.now - since;
        let after_bytes = self.bytes_done();
        if let Some(record) = self.record() {
            record.acks.push(AckPulse { after_bytes, width_ns });
        }
        if let Phase::WaitAck { index, since: window, .. } = self.phase {
            if since >= window && width_ns >= self.timing.min_ack_ns {
                let done = index + 1;
                let stall = self
                    .current
                    .as_ref()
                    .is_some_and(|e| e.stall_after == Some(done));
                self.phase = if stall {
                    Phase::Ending { at: self.now + self.timing.stall_ns }
                } else {
                    Phase::Byte {
                        index: done,
                        start: self.now + self.timing.gap_ns,
                        sampled: 0,
                    }
                };
            }
        }
    }
}

/// A console on the other end of the bus, driven by virtual time.
///
/// Time only moves when the device looks at a line or the clock, so the
/// device code runs against the waveform exactly as if it were polling real
/// pins.
pub struct SimHost<'a> {
    inner: RefCell<Inner>,
    abort: Cell<Option<&'a AbortSignal>>,
    irq: SimInterrupt,
}

/// One lower-priority interrupt that costs `cost_ns` of CPU time when it
/// fires on the `at_read`th clock read. It runs at once unless masked, in
/// which case it runs when the mask is lifted.
#[derive(Default)]
struct SimInterrupt {
    at_read: Cell<Option<usize>>,
    cost_ns: Cell<u64>,
    clock_reads: Cell<usize>,
    masked: Cell<bool>,
    pending: Cell<bool>,
    fired: Cell<usize>,
    holds: Cell<usize>,
}

impl<'a> SimHost<'a> {
    pub fn new(timing: HostTiming) -> Self {
        let mut inner = Inner {
            timing,
            now: 0,
            phase: Phase::Done { since: 0 },
            queue: VecDeque::new(),
            current: None,
            records: Vec::new(),
            shift: 0,
            command_hold: None,
            data: LineState::Released,
            ack: LineState::Released,
            ack_low_since: None,
            stray_drive: false,
        };
        inner.next_exchange(0);
        Self {
            inner: RefCell::new(inner),
            abort: Cell::new(None),
            irq: SimInterrupt::default(),
        }
    }

    /// Raise an interrupt costing `cost_ns` on the `nth` clock read.
    pub fn interrupt_at_clock_read(&self, nth: usize, cost_ns: u64) {
        self.irq.at_read.set(Some(nth));
        self.irq.cost_ns.set(cost_ns);
        self.irq.clock_reads.set(0);
    }

    /// Clock reads since the last `interrupt_at_clock_read`.
    pub fn clock_reads(&self) -> usize {
        self.irq.clock_reads.get()
    }

    /// Times the interrupt handler ran.
    pub fn interrupts_fired(&self) -> usize {
        self.irq.fired.get()
    }

    /// Times lower-priority interrupts were masked.
    pub fn mask_count(&self) -> usize {
        self.irq.holds.get()
    }

    pub fn interrupts_masked(&self) -> bool {
        self.irq.masked.get()
    }

    fn run_interrupt(&self) {
        self.irq.fired.set(self.irq.fired.get() + 1);
        self.advance(self.irq.cost_ns.get());
    }

    fn count_clock_read(&self) {
        let reads = self.irq.clock_reads.get() + 1;
        self.irq.clock_reads.set(reads);
        if self.irq.at_read.get() != Some(reads) {
            return;
        }
        if self.irq.masked.get() {
            self.irq.pending.set(true);
        } else {
            self.run_interrupt();
        }
    }

    /// Schedule exchanges, played in order with `idle_ns` between them.
    pub fn push(&self, exchange: Exchange) {
        let mut inner = self.inner.borrow_mut();
        inner.queue.push_back(exchange);
        if let Phase::Done { since } = inner.phase {
            let at = since.max(inner.now);
            inner.next_exchange(at);
        }
    }

    pub fn push_many(&self, exchange: Exchange, count: usize) {
        for _ in 0..count {
            self.push(exchange.clone());
        }
    }

    /// Deliver select rising edges to `abort` like the pin interrupt does.
    pub fn attach_abort(&self, abort: &'a AbortSignal) {
        self.abort.set(Some(abort));
    }

    pub fn records(&self) -> Vec<Record> {
        self.inner.borrow().records.clone()
    }

    pub fn last_record(&self) -> Record {
        self.inner.borrow().records.last().cloned().unwrap_or_default()
    }

    /// A line was pulled low while select was high.
    pub fn stray_drive(&self) -> bool {
        self.inner.borrow().stray_drive
    }

    pub fn lines_released(&self) -> bool {
        let inner = self.inner.borrow();
        inner.data == LineState::Released && inner.ack == LineState::Released
    }

    pub fn now_ns(&self) -> u64 {
        self.inner.borrow().now
    }

    fn advance(&self, dt: u64) {
        let rose = {
            let mut inner = self.inner.borrow_mut();
            let target = inner.now + dt;
            inner.step_to(target)
        };
        if rose {
            if let Some(abort) = self.abort.get() {
                abort.on_select_rising(self);
            }
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        self.advance(READ_NS);
        f(&self.inner.borrow())
    }
}

impl PadBus for SimHost<'_> {
    fn select_high(&self) -> bool {
        self.read(Inner::select_high)
    }

    fn clock_high(&self) -> bool {
        self.count_clock_read();
        self.read(|inner| match inner.bit_at() {
            Some((_, _, within)) => within >= inner.timing.bit_ns / 2,
            None => true,
        })
    }

    fn command_high(&self) -> bool {
        self.read(|inner| match (inner.bit_at(), inner.current.as_ref()) {
            (Some((index, bit, _)), Some(exchange)) => {
                exchange.bytes[index] & (1 << bit) != 0
            }
            // The console holds each bit through the high half of its
            // clock, the last one included.
            _ => match inner.command_hold {
                Some((until, level)) if inner.now < until => level,
                _ => true,
            },
        })
    }

    fn set_data(&self, state: LineState) {
        let mut inner = self.inner.borrow_mut();
        inner.data = state;
        if state == LineState::DrivenLow {
            if inner.select_high() {
                inner.stray_drive = true;
            }
            if let Some(record) = inner.record() {
                record.data_driven = true;
            }
        }
    }

    fn set_ack(&self, state: LineState) {
        let mut inner = self.inner.borrow_mut();
        inner.ack = state;
        match state {
            LineState::DrivenLow => {
                if inner.select_high() {
                    inner.stray_drive = true;
                }
                if inner.ack_low_since.is_none() {
                    inner.ack_low_since = Some(inner.now);
                }
            }
            LineState::Released => inner.ack_released(),
        }
    }
}

impl Timebase for SimHost<'_> {
    fn ticks(&self) -> u32 {
        self.advance(TICK_NS);
        self.inner.borrow().now as u32
    }

    fn ticks_per_us(&self) -> u32 {
        1_000
    }

    fn now_us(&self) -> u64 {
        self.inner.borrow().now / 1_000
    }
}

impl PreemptionGuard for SimHost<'_> {
    type Saved = bool;

    fn hold(&self) -> bool {
        self.irq.holds.set(self.irq.holds.get() + 1);
        self.irq.masked.replace(true)
    }

    fn restore(&self, saved: bool) {
        self.irq.masked.set(saved);
        if !saved && self.irq.pending.take() {
            self.run_interrupt();
        }
    }
}
