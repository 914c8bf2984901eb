use portable_atomic::{AtomicBool, Ordering};

use crate::line::PadBus;

/// Cancellation token shared between the protocol loop and the select-line
/// interrupt.
///
/// The interrupt side calls [`on_select_rising`](Self::on_select_rising);
/// the protocol side opens and closes transactions and checks
/// [`is_active`](Self::is_active) at its checkpoints. Each flag has exactly
/// one writer per phase and every store/load pair is release/acquire.
pub struct AbortSignal {
    active: AtomicBool,
    masked: AtomicBool,
    pending: AtomicBool,
}

impl AbortSignal {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            masked: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    /// Mark the start of a transaction.
    #[inline(always)]
    pub fn begin(&self) {
        self.pending.store(false, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    /// Mark the end of a transaction.
    #[inline(always)]
    pub fn end(&self) {
        self.active.store(false, Ordering::Release);
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Interrupt handler body for the select rising edge.
    ///
    /// Releases the bus and clears the active flag, unless the protocol
    /// context is in a masked section, in which case the edge is only
    /// recorded and later discarded by [`unmask`](Self::unmask).
    #[inline(always)]
    pub fn on_select_rising<B: PadBus + ?Sized>(&self, bus: &B) {
        if self.masked.load(Ordering::Acquire) {
            self.pending.store(true, Ordering::Release);
            return;
        }
        bus.release();
        self.active.store(false, Ordering::Release);
    }

    /// Hold off the abort handler, e.g. while an acknowledge pulse is out.
    #[inline(always)]
    pub fn mask(&self) {
        self.masked.store(true, Ordering::Release);
    }

    /// Re-enable the abort handler, dropping any edge seen while masked.
    ///
    /// Returns whether an edge was dropped. Callers re-check the select line
    /// themselves afterwards.
    #[inline(always)]
    pub fn unmask(&self) -> bool {
        let dropped = self.pending.swap(false, Ordering::AcqRel);
        self.masked.store(false, Ordering::Release);
        dropped
    }

    #[inline(always)]
    pub fn is_masked(&self) -> bool {
        self.masked.load(Ordering::Acquire)
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}
