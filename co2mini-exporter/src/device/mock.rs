use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{HidHandle, HidTransport};

/// Scripted outcome of one `read_timeout` call.
#[derive(Debug, Clone)]
pub enum MockRead {
    Report(Vec<u8>),
    Timeout,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mock device error: {0}")]
pub struct MockError(pub String);

#[derive(Default)]
struct Script {
    open_failures: usize,
    unlock_failures: usize,
    reads: VecDeque<MockRead>,
    opened_ids: Vec<(u16, u16)>,
    open_attempts: usize,
    feature_reports: Vec<Vec<u8>>,
    closes: usize,
    drained: Option<CancellationToken>,
}

/// Transport that replays a script instead of talking to hardware.
///
/// Clones share the same script, so a test can keep one copy and inspect
/// what the monitor loop did with the other.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<Script>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` opens fail.
    pub fn fail_opens(&self, count: usize) {
        self.script().open_failures += count;
    }

    /// Make the next `count` unlock reports fail.
    pub fn fail_unlocks(&self, count: usize) {
        self.script().unlock_failures += count;
    }

    pub fn push_read(&self, read: MockRead) {
        self.script().reads.push_back(read);
    }

    pub fn push_report(&self, bytes: &[u8]) {
        self.push_read(MockRead::Report(bytes.to_vec()));
    }

    /// Cancel `token` once every scripted read has been served.
    ///
    /// Reads past the end of the script time out.
    pub fn cancel_when_drained(&self, token: CancellationToken) {
        self.script().drained = Some(token);
    }

    pub fn open_attempts(&self) -> usize {
        self.script().open_attempts
    }

    pub fn opened_ids(&self) -> Vec<(u16, u16)> {
        self.script().opened_ids.clone()
    }

    pub fn feature_reports(&self) -> Vec<Vec<u8>> {
        self.script().feature_reports.clone()
    }

    pub fn closes(&self) -> usize {
        self.script().closes
    }

    pub fn remaining_reads(&self) -> usize {
        self.script().reads.len()
    }
}

#[async_trait]
impl HidTransport for MockTransport {
    type Error = MockError;
    type Handle = MockHandle;

    async fn open(&mut self, vendor_id: u16, product_id: u16) -> Result<MockHandle, MockError> {
        let mut script = self.script();
        script.open_attempts += 1;

        if script.open_failures > 0 {
            script.open_failures -= 1;
            return Err(MockError("device not found".into()));
        }

        script.opened_ids.push((vendor_id, product_id));
        Ok(MockHandle {
            script: Arc::clone(&self.script),
        })
    }
}

pub struct MockHandle {
    script: Arc<Mutex<Script>>,
}

impl MockHandle {
    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HidHandle for MockHandle {
    type Error = MockError;

    async fn send_feature_report(&mut self, data: &[u8]) -> Result<(), MockError> {
        let mut script = self.script();
        if script.unlock_failures > 0 {
            script.unlock_failures -= 1;
            return Err(MockError("broken pipe".into()));
        }

        script.feature_reports.push(data.to_vec());
        Ok(())
    }

    async fn read_timeout(
        &mut self,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<usize, MockError> {
        let mut script = self.script();
        let next = script.reads.pop_front();

        if script.reads.is_empty() {
            if let Some(token) = &script.drained {
                token.cancel();
            }
        }

        match next {
            Some(MockRead::Report(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Some(MockRead::Error(message)) => Err(MockError(message)),
            Some(MockRead::Timeout) | None => Ok(0),
        }
    }

    fn close(self) {
        self.script().closes += 1;
    }
}
