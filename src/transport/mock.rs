//! Recording transport for tests

use crate::transport::traits::{Transport, TransportError};
use async_trait::async_trait;
use roverlink_shared::WireCommand;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

/// In-memory transport that records every command with its send time
pub struct MockTransport {
    sent: Mutex<Vec<(Instant, WireCommand)>>,
    /// Fail the command with this 0-based index (counting all sends)
    fail_at: Mutex<Option<usize>>,
    probe_ok: AtomicBool,
    status: Mutex<Option<Value>>,
    status_fetches: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_at: Mutex::new(None),
            probe_ok: AtomicBool::new(true),
            status: Mutex::new(Some(Value::Object(Default::default()))),
            status_fetches: AtomicUsize::new(0),
        }
    }

    pub fn fail_command_at(&self, index: usize) {
        *self.fail_at.lock().unwrap() = Some(index);
    }

    pub fn set_probe_ok(&self, ok: bool) {
        self.probe_ok.store(ok, Ordering::SeqCst);
    }

    /// `None` makes status fetches fail
    pub fn set_status(&self, status: Option<Value>) {
        *self.status.lock().unwrap() = status;
    }

    pub fn sent(&self) -> Vec<WireCommand> {
        self.sent.lock().unwrap().iter().map(|(_, cmd)| *cmd).collect()
    }

    pub fn sent_with_times(&self) -> Vec<(Instant, WireCommand)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn status_fetches(&self) -> usize {
        self.status_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn probe(&self, _endpoint: &str) -> Result<(), TransportError> {
        if self.probe_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    async fn send_command(
        &self,
        _endpoint: &str,
        command: &WireCommand,
    ) -> Result<Option<String>, TransportError> {
        let mut sent = self.sent.lock().unwrap();
        if *self.fail_at.lock().unwrap() == Some(sent.len()) {
            return Err(TransportError::Unreachable("scripted failure".into()));
        }
        sent.push((Instant::now(), *command));
        Ok(Some("ok".into()))
    }

    async fn fetch_status(&self, _endpoint: &str) -> Result<Value, TransportError> {
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        self.status
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::Unreachable("scripted status failure".into()))
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}
