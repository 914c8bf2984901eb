use crate::prelude::*;
use embassy_futures::join::join;
use embassy_nrf::usb::Driver;
use embassy_usb::Config;
use psx_pad_bsp::usb::UsbDriverBuilder;
use static_cell::ConstStaticCell;

// Re-exports
use postcard_rpc::{
    define_dispatch,
    server::{
        impls::embassy_usb_v0_5::{
            dispatch_impl::{
                spawn_fn, WireRxBuf, WireRxImpl, WireSpawnImpl, WireStorage,
                WireTxImpl,
            },
            PacketBuffers,
        },
        Dispatch, Server, SpawnContext,
    },
};

mod device_info;
mod settings;
mod stats;

use device_info::*;
use settings::*;
use stats::*;

// Postcard types
type MutexType = CriticalSectionRawMutex;
pub type AppTx = WireTxImpl<MutexType, AppDriver>;
type AppRx = WireRxImpl<AppDriver>;
type AppServer = Server<AppTx, AppRx, WireRxBuf, PsxPadUsbApp>;

type AppDriver =
    Driver<'static, embassy_nrf::usb::vbus_detect::HardwareVbusDetect>;
type AppStorage = WireStorage<MutexType, AppDriver, 256, 256, 64, 256>;
type BufStorage = PacketBuffers<1024, 1024>;

// Statics
static PBUFS: ConstStaticCell<BufStorage> =
    ConstStaticCell::new(BufStorage::new());
static STORAGE: AppStorage = AppStorage::new();

pub struct Context {
    pub app: &'static Mutex<MutexType, AppContext>,
}

define_dispatch! {
    app: PsxPadUsbApp;
    spawn_fn: spawn_fn;
    tx_impl: AppTx;
    spawn_impl: WireSpawnImpl;
    context: Context;

    endpoints: {
        list: ENDPOINT_LIST;

        | EndpointTy                | kind      | handler                       |
        | ----------                | ----      | -------                       |
        | StatsGetEndpoint          | async     | stats_get                     |
        | StatsResetEndpoint        | async     | stats_reset                   |
        | AckStatusEndpoint         | async     | ack_status                    |
        | SettingsGetEndpoint       | async     | settings_get                  |
        | SettingsSetEndpoint       | async     | settings_set                  |
        | DeviceInfoGetEndpoint     | async     | device_info_get               |
    };
    topics_in: {
        list: TOPICS_IN_LIST;

        | TopicTy                   | kind      | handler                       |
        | ----------                | ----      | -------                       |
    };
    topics_out: {
        list: TOPICS_OUT_LIST;
    };
}

// Structs
pub struct SpawnCtx {
    pub app: &'static Mutex<CriticalSectionRawMutex, AppContext>,
}

impl SpawnContext for Context {
    type SpawnCtxt = SpawnCtx;
    fn spawn_ctxt(&mut self) -> Self::SpawnCtxt {
        SpawnCtx { app: self.app }
    }
}

// USB configuration
fn usb_config() -> Config<'static> {
    let mut config = Config::new(0x16c0, 0x27DD);
    config.manufacturer = Some(MANUFACTURER);
    config.product = Some("psx-pad");
    config.serial_number = Some("00000001");

    // Required for windows compatibility.
    // https://developer.nordicsemi.com/nRF_Connect_SDK/doc/1.9.1/kconfig/CONFIG_CDC_ACM_IAD.html#help
    config.device_class = 0xEF;
    config.device_sub_class = 0x02;
    config.device_protocol = 0x01;
    config.composite_with_iads = true;

    config
}

/// Debug console served over USB on the medium-priority executor.
#[embassy_executor::task]
pub async fn usb_task(
    usbd: UsbDriverBuilder,
    app_context: &'static Mutex<CriticalSectionRawMutex, AppContext>,
) {
    let spawner = Spawner::for_current_executor().await;
    let context = Context { app: app_context };
    let dispatcher = PsxPadUsbApp::new(context, spawner.into());
    let vkk = dispatcher.min_key_len();

    let driver = usbd.init();
    let pbufs = PBUFS.take();
    let config = usb_config();

    let (mut device, tx_impl, rx_impl) =
        STORAGE.init(driver, config, pbufs.tx_buf.as_mut_slice(), 64);

    let mut server: AppServer = Server::new(
        tx_impl,
        rx_impl,
        pbufs.rx_buf.as_mut_slice(),
        dispatcher,
        vkk,
    );

    let server_fut = async {
        // Need to allow time for the USB driver to intialize prior to running the postcard server.
        Timer::after(Duration::from_secs(2)).await;
        info!("Starting Postcard Server...");
        server.run().await;
    };

    let _ = join(server_fut, device.run()).await;
    warn!("Exiting usb_task!!");
}
