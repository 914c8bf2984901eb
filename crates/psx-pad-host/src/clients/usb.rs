use postcard_rpc::{
    header::VarSeqKind,
    host_client::{HostClient, HostErr},
    standard_icd::{WireError, ERROR_PATH},
};
use psx_pad_icd::{
    AckStatus, AckStatusEndpoint, DeviceInfo, DeviceInfoGetEndpoint,
    PadStats, Settings, SettingsGetEndpoint, SettingsSetEndpoint,
    StatsGetEndpoint, StatsResetEndpoint,
};
use std::convert::Infallible;
use std::fmt;

/// USB product string the adapter enumerates with.
pub const PRODUCT: &str = "psx-pad";

pub struct UsbClient {
    pub client: HostClient<WireError>,
}

#[derive(Debug)]
pub enum UsbError<E> {
    Comms(HostErr<WireError>),
    Endpoint(E),
}

impl<E> From<HostErr<WireError>> for UsbError<E> {
    fn from(value: HostErr<WireError>) -> Self {
        Self::Comms(value)
    }
}

impl<E: fmt::Debug> fmt::Display for UsbError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comms(e) => write!(f, "communication error: {e:?}"),
            Self::Endpoint(e) => write!(f, "endpoint error: {e:?}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for UsbError<E> {}

impl UsbClient {
    pub fn try_new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    {
        let client = HostClient::try_new_raw_nusb(
            |d| d.product_string() == Some(PRODUCT),
            ERROR_PATH,
            8,
            VarSeqKind::Seq2,
        )?;
        Ok(Self { client })
    }

    pub async fn wait_closed(&self) {
        self.client.wait_closed().await;
    }

    pub fn is_connected(&self) -> bool {
        !self.client.is_closed()
    }

    // Telemetry Methods
    pub async fn get_stats(&self) -> Result<PadStats, UsbError<Infallible>> {
        let stats = self.client.send_resp::<StatsGetEndpoint>(&()).await?;
        Ok(stats)
    }

    pub async fn reset_stats(&self) -> Result<(), UsbError<Infallible>> {
        self.client.send_resp::<StatsResetEndpoint>(&()).await?;
        Ok(())
    }

    pub async fn get_ack_status(
        &self,
    ) -> Result<AckStatus, UsbError<Infallible>> {
        let status = self.client.send_resp::<AckStatusEndpoint>(&()).await?;
        Ok(status)
    }

    // Settings Methods
    pub async fn get_settings(
        &self,
    ) -> Result<Settings, UsbError<Infallible>> {
        let settings =
            self.client.send_resp::<SettingsGetEndpoint>(&()).await?;
        Ok(settings)
    }

    /// Store and apply `settings`. The device answers `false` when the
    /// flash write failed.
    pub async fn set_settings(
        &self,
        settings: Settings,
    ) -> Result<(), UsbError<&'static str>> {
        let stored =
            self.client.send_resp::<SettingsSetEndpoint>(&settings).await?;
        if stored {
            Ok(())
        } else {
            Err(UsbError::Endpoint("settings could not be stored"))
        }
    }

    // Device Info Methods
    pub async fn get_device_info(
        &self,
    ) -> Result<DeviceInfo, UsbError<Infallible>> {
        let info = self.client.send_resp::<DeviceInfoGetEndpoint>(&()).await?;
        Ok(info)
    }
}
