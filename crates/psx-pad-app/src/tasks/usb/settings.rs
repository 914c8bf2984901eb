use crate::prelude::*;
use postcard_rpc::header::VarHeader;

pub async fn settings_get(
    context: &mut super::Context,
    _header: VarHeader,
    _req: (),
) -> Settings {
    let app_ctx = context.app.lock().await;
    app_ctx.settings_store.settings().into()
}

pub async fn settings_set(
    context: &mut super::Context,
    _header: VarHeader,
    req: Settings,
) -> bool {
    let mut app_ctx = context.app.lock().await;
    app_ctx.save_settings(req.into()).await
}
