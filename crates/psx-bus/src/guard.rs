/// Keeps lower-priority contexts from running while a transaction owns the
/// bus.
///
/// A bit lasts about 4us and the device has to react within half of that,
/// so nothing but the select abort path may interrupt the protocol loop
/// between [`hold`](Self::hold) and [`restore`](Self::restore). Work held
/// off meanwhile runs once the transaction is over.
pub trait PreemptionGuard {
    /// Whatever `hold` replaced, handed back to `restore`.
    type Saved: Copy;

    fn hold(&self) -> Self::Saved;
    fn restore(&self, saved: Self::Saved);
}

/// For targets where the protocol loop has a core to itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unguarded;

impl PreemptionGuard for Unguarded {
    type Saved = ();

    #[inline(always)]
    fn hold(&self) {}

    #[inline(always)]
    fn restore(&self, _saved: ()) {}
}

impl<G: PreemptionGuard + ?Sized> PreemptionGuard for &G {
    type Saved = G::Saved;

    #[inline(always)]
    fn hold(&self) -> G::Saved {
        (**self).hold()
    }

    #[inline(always)]
    fn restore(&self, saved: G::Saved) {
        (**self).restore(saved)
    }
}
