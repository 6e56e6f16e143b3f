use std::time::Duration;

use co2mini_core::{RawReport, Reading};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::MonitorConfig;
use crate::device::{DeviceSession, HidTransport, SessionError};
use crate::metrics::MetricsRegistry;

/// Connection state of the monitor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Disconnected,
    Connecting,
    Connected,
}

/// Keeps a sensor connected and feeds its readings into the metrics registry.
///
/// Open failures and read errors are logged and retried after a fixed delay,
/// forever. The loop only returns once `cancel` fires.
pub struct MonitorLoop<T: HidTransport> {
    transport: T,
    metrics: MetricsRegistry,
    config: MonitorConfig,
    state: MonitorState,
}

impl<T: HidTransport> MonitorLoop<T> {
    pub fn new(transport: T, metrics: MetricsRegistry, config: MonitorConfig) -> Self {
        Self {
            transport,
            metrics,
            config,
            state: MonitorState::Disconnected,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    #[instrument(
        name = "monitor",
        skip_all,
        fields(vendor_id = self.config.vendor_id, product_id = self.config.product_id)
    )]
    pub async fn run(&mut self, cancel: CancellationToken) {
        let retry_delay = self.config.retry_delay();

        while !cancel.is_cancelled() {
            let mut session = match self.connect().await {
                Ok(session) => session,
                Err(e) => {
                    error!(error = %e, "Failed to open device");
                    self.transition(MonitorState::Disconnected);
                    info!(retry_delay_secs = retry_delay.as_secs_f64(), "Retrying");
                    if !pause(retry_delay, &cancel).await {
                        break;
                    }
                    continue;
                }
            };

            let result = self.read_cycle(&mut session, &cancel).await;
            session.close();
            self.transition(MonitorState::Disconnected);

            if let Err(e) = result {
                error!(error = %e, "Error during monitoring");
                if !pause(retry_delay, &cancel).await {
                    break;
                }
            }
        }

        info!("Monitor stopped");
    }

    async fn connect(&mut self) -> Result<DeviceSession<T>, SessionError<T::Error>> {
        self.transition(MonitorState::Connecting);
        info!("Attempting to connect to CO2 sensor");

        let session =
            DeviceSession::open(&mut self.transport, self.config.vendor_id, self.config.product_id)
                .await?;

        self.transition(MonitorState::Connected);
        info!("Device unlocked, monitoring started");
        Ok(session)
    }

    /// Poll the device until it fails or `cancel` fires.
    async fn read_cycle(
        &self,
        session: &mut DeviceSession<T>,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError<T::Error>> {
        let read_timeout = self.config.read_timeout();
        let poll_interval = self.config.poll_interval();

        while !cancel.is_cancelled() {
            if let Some(report) = session.read(read_timeout).await? {
                self.handle_report(&report);
            }

            if !pause(poll_interval, cancel).await {
                break;
            }
        }

        Ok(())
    }

    fn handle_report(&self, report: &RawReport) {
        let Some(reading) = co2mini_core::decode(report.as_bytes()) else {
            debug!(bytes = ?report.as_bytes(), "Dropping frame without a reading");
            return;
        };

        self.metrics.publish(&reading);
        match reading {
            Reading::Co2(ppm) => info!(ppm, "CO2"),
            Reading::Temperature(celsius) => info!(celsius = %format!("{celsius:.2}"), "Temperature"),
        }
    }

    fn transition(&mut self, next: MonitorState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Monitor state changed");
            self.state = next;
        }
    }
}

/// Sleep for `duration`. Returns false if `cancel` fired first.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
