use std::time::Duration;

use async_trait::async_trait;
use hidapi::{HidApi, HidDevice, HidError};
use tokio::task::block_in_place;

use super::{HidHandle, HidTransport};

/// Transport backed by the system HID library.
///
/// hidapi calls block the calling thread; they run under `block_in_place`,
/// which requires the multi-threaded tokio runtime.
pub struct HidApiTransport {
    api: HidApi,
}

impl HidApiTransport {
    pub fn new() -> Result<Self, HidError> {
        Ok(Self { api: HidApi::new()? })
    }
}

#[async_trait]
impl HidTransport for HidApiTransport {
    type Error = HidError;
    type Handle = HidApiHandle;

    async fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<HidApiHandle, HidError> {
        let api = &self.api;
        let device = block_in_place(|| api.open(vendor_id, product_id))?;
        Ok(HidApiHandle { device })
    }
}

pub struct HidApiHandle {
    device: HidDevice,
}

#[async_trait]
impl HidHandle for HidApiHandle {
    type Error = HidError;

    async fn send_feature_report(&mut self, data: &[u8]) -> Result<(), HidError> {
        let device = &self.device;
        block_in_place(|| device.send_feature_report(data))
    }

    async fn read_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, HidError> {
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let device = &self.device;
        block_in_place(|| device.read_timeout(buf, timeout_ms))
    }

    fn close(self) {
        // hidapi closes the device when the handle is dropped
        drop(self.device);
    }
}
