use crate::prelude::*;
use postcard_rpc::header::VarHeader;

pub async fn stats_get(
    _context: &mut super::Context,
    _header: VarHeader,
    _req: (),
) -> PadStats {
    PadStats::new(
        TELEMETRY.snapshot(),
        SAMPLING.stats(),
        SAMPLING.last_sample(),
    )
}

/// The counters are zeroed by the protocol context at the start of the next
/// transaction.
pub async fn stats_reset(
    _context: &mut super::Context,
    _header: VarHeader,
    _req: (),
) {
    info!("Statistics reset requested");
    TELEMETRY.request_reset();
    SAMPLING.reset_intervals();
}

pub async fn ack_status(
    context: &mut super::Context,
    _header: VarHeader,
    _req: (),
) -> AckStatus {
    let mode = {
        let app_ctx = context.app.lock().await;
        icd::AckMode::from(&app_ctx.ack_mode)
    };
    AckStatus::new(mode, TELEMETRY.calibration())
}
