/// Why a bus operation gave up.
///
/// Neither kind is fatal: the host restarts every exchange on its own, so
/// the engine just releases the bus and waits for the next select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// An expected clock edge did not arrive in time.
    Timeout,
    /// Select was deasserted mid-transaction.
    Aborted,
}

impl core::fmt::Display for BusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BusError::Timeout => write!(f, "clock edge timed out"),
            BusError::Aborted => write!(f, "select deasserted"),
        }
    }
}
