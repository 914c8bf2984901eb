pub mod clients;
pub mod report;

pub use clients::{UsbClient, UsbError};
pub use psx_pad_icd as icd;
