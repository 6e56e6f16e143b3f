pub mod hid;
pub mod mock;

use std::time::Duration;

use async_trait::async_trait;
use co2mini_core::RawReport;
use co2mini_core::protocol::REPORT_SIZE;
use tracing::debug;

/// Time the device needs after the unlock report before it streams frames.
pub const UNLOCK_SETTLE: Duration = Duration::from_millis(500);

/// Access to HID-class devices.
///
/// This is the only seam between the exporter and the USB stack. The monitor
/// loop never sees a concrete transport library.
#[async_trait]
pub trait HidTransport: Send + 'static {
    /// Error type for this transport implementation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Handle to one open device.
    type Handle: HidHandle<Error = Self::Error>;

    /// Open the first device matching the given ids.
    async fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<Self::Handle, Self::Error>;
}

/// An open HID device.
#[async_trait]
pub trait HidHandle: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write a feature report. The first byte is the report id.
    async fn send_feature_report(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Block up to `timeout` for the next input report.
    ///
    /// Returns the number of bytes written to `buf`; 0 means the timeout
    /// elapsed with no data.
    async fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration)
    -> Result<usize, Self::Error>;

    /// Release the device.
    fn close(self);
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError<E> {
    #[error("failed to open device {vendor_id:04x}:{product_id:04x}: {source}")]
    Open {
        vendor_id: u16,
        product_id: u16,
        #[source]
        source: E,
    },

    #[error("failed to unlock device: {0}")]
    Unlock(#[source] E),

    #[error("device read failed: {0}")]
    Read(#[source] E),

    #[error("device session is closed")]
    Closed,
}

/// One open, unlocked sensor.
///
/// The handle is released exactly once: by [`DeviceSession::close`] or, on any
/// other exit path, when the session is dropped.
pub struct DeviceSession<T: HidTransport> {
    handle: Option<T::Handle>,
    vendor_id: u16,
    product_id: u16,
}

impl<T: HidTransport> DeviceSession<T> {
    /// Open the device and send the unlock handshake.
    ///
    /// Failures are returned as is; retrying is up to the caller.
    pub async fn open(
        transport: &mut T,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Self, SessionError<T::Error>> {
        let handle = transport
            .open(vendor_id, product_id)
            .await
            .map_err(|source| SessionError::Open {
                vendor_id,
                product_id,
                source,
            })?;

        let mut session = Self {
            handle: Some(handle),
            vendor_id,
            product_id,
        };
        session.unlock().await?;

        Ok(session)
    }

    async fn unlock(&mut self) -> Result<(), SessionError<T::Error>> {
        let handle = self.handle.as_mut().ok_or(SessionError::Closed)?;
        handle
            .send_feature_report(&co2mini_core::unlock_report())
            .await
            .map_err(SessionError::Unlock)?;

        tokio::time::sleep(UNLOCK_SETTLE).await;
        Ok(())
    }

    /// Read the next report. `Ok(None)` means the timeout elapsed.
    pub async fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<RawReport>, SessionError<T::Error>> {
        let handle = self.handle.as_mut().ok_or(SessionError::Closed)?;

        let mut buf = [0u8; REPORT_SIZE];
        let n = handle
            .read_timeout(&mut buf, timeout)
            .await
            .map_err(SessionError::Read)?;

        if n == 0 {
            return Ok(None);
        }

        Ok(Some(RawReport::new(&buf[..n.min(REPORT_SIZE)])))
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Release the device. Calling this more than once is a no-op.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            debug!(
                vendor_id = self.vendor_id,
                product_id = self.product_id,
                "Device handle closed"
            );
        }
    }
}

impl<T: HidTransport> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockRead, MockTransport};
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_open_sends_unlock_and_settles() {
        let mut transport = MockTransport::new();
        let start = tokio::time::Instant::now();

        let session = DeviceSession::open(&mut transport, 0x04D9, 0xA052)
            .await
            .unwrap();

        assert!(session.is_open());
        assert_eq!(start.elapsed(), UNLOCK_SETTLE);
        assert_eq!(
            transport.feature_reports(),
            vec![vec![0x00, 0x86, 0x41, 0xC9, 0xA8, 0x7F, 0x41, 0x3C, 0xCA]]
        );
        assert_eq!(transport.opened_ids(), vec![(0x04D9, 0xA052)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure() {
        let mut transport = MockTransport::new();
        transport.fail_opens(1);

        let result = DeviceSession::open(&mut transport, 0x04D9, 0xA052).await;
        assert!(matches!(result, Err(SessionError::Open { .. })));
        assert!(transport.feature_reports().is_empty());
        assert_eq!(transport.closes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_failure_releases_handle() {
        let mut transport = MockTransport::new();
        transport.fail_unlocks(1);

        let result = DeviceSession::open(&mut transport, 0x04D9, 0xA052).await;
        assert!(matches!(result, Err(SessionError::Unlock(_))));
        assert_eq!(transport.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_is_none() {
        let mut transport = MockTransport::new();
        transport.push_read(MockRead::Timeout);
        transport.push_report(&[0x50, 0x01, 0x90, 0xE1, 0x0D, 0x00, 0x00, 0x00]);

        let mut session = DeviceSession::open(&mut transport, 0x04D9, 0xA052)
            .await
            .unwrap();

        assert_eq!(session.read(Duration::from_secs(1)).await.unwrap(), None);
        let report = session.read(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(report.as_bytes(), &[0x50, 0x01, 0x90, 0xE1, 0x0D, 0x00, 0x00, 0x00]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let mut transport = MockTransport::new();
        let mut session = DeviceSession::open(&mut transport, 0x04D9, 0xA052)
            .await
            .unwrap();

        session.close();
        session.close();
        assert!(!session.is_open());
        assert!(matches!(
            session.read(Duration::from_secs(1)).await,
            Err(SessionError::Closed)
        ));
        drop(session);

        assert_eq!(transport.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_handle() {
        let mut transport = MockTransport::new();
        {
            let _session = DeviceSession::open(&mut transport, 0x04D9, 0xA052)
                .await
                .unwrap();
        }
        assert_eq!(transport.closes(), 1);
    }
}
