//! Telemetry Poller
//!
//! Runs a background task that fetches the status report at a fixed interval
//! and replaces the stored snapshot whenever a poll succeeds.

use crate::connection::ConnectionManager;
use crate::transport::{Transport, TransportError};
use roverlink_shared::{timing, DecodeError, SensorSnapshot};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Configuration for the telemetry poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Time between polls
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(timing::TELEMETRY_POLL_INTERVAL_MS),
        }
    }
}

/// Errors from a single poll
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("not connected to robot")]
    NotConnected,

    #[error("status fetch failed: {0}")]
    Fetch(#[from] TransportError),

    #[error("status decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Polls the robot's status surface and caches the latest snapshot
pub struct TelemetryPoller {
    transport: Arc<dyn Transport>,
    connection: Arc<ConnectionManager>,
    config: PollerConfig,
    /// Latest successful reading; starts all-zero
    snapshot: Arc<RwLock<SensorSnapshot>>,
}

impl TelemetryPoller {
    /// Create a new poller with an all-zero snapshot
    pub fn new(
        transport: Arc<dyn Transport>,
        connection: Arc<ConnectionManager>,
        config: PollerConfig,
    ) -> Self {
        Self {
            transport,
            connection,
            config,
            snapshot: Arc::new(RwLock::new(SensorSnapshot::default())),
        }
    }

    /// Latest snapshot
    pub async fn snapshot(&self) -> SensorSnapshot {
        *self.snapshot.read().await
    }

    /// Poll once and replace the snapshot on success
    ///
    /// On failure the previous snapshot is kept untouched.
    pub async fn read_now(&self) -> Result<SensorSnapshot, TelemetryError> {
        let endpoint = self
            .connection
            .endpoint()
            .await
            .ok_or(TelemetryError::NotConnected)?;

        let report = self.transport.fetch_status(&endpoint).await?;
        let snapshot = SensorSnapshot::from_status(&report)?;

        *self.snapshot.write().await = snapshot;
        debug!(
            "Telemetry: ultrasonic={}cm battery={}V line={:?}",
            snapshot.ultrasonic, snapshot.battery, snapshot.line_tracking
        );
        Ok(snapshot)
    }

    /// Start the background polling task
    ///
    /// Ticks are skipped while disconnected. Polling stops when the returned
    /// handle is stopped or dropped.
    pub fn start(self: &Arc<Self>) -> PollerHandle {
        let poller = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(poller.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if !poller.connection.is_connected().await {
                    continue;
                }

                if let Err(e) = poller.read_now().await {
                    warn!("Telemetry poll failed: {}", e);
                }
            }
        });

        info!("Telemetry polling started every {:?}", self.config.interval);
        PollerHandle { task }
    }
}

/// Handle to stop telemetry polling
pub struct PollerHandle {
    task: tokio::task::JoinHandle<()>,
}

impl PollerHandle {
    /// Stop polling; an in-flight request is abandoned
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
        debug!("Telemetry polling stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use roverlink_shared::LineTracking;
    use serde_json::json;

    async fn connected_poller() -> (Arc<MockTransport>, Arc<ConnectionManager>, Arc<TelemetryPoller>) {
        let transport = Arc::new(MockTransport::new());
        let connection = Arc::new(ConnectionManager::new(transport.clone()));
        connection.connect("192.168.4.1").await.unwrap();
        let poller = Arc::new(TelemetryPoller::new(
            transport.clone(),
            connection.clone(),
            PollerConfig::default(),
        ));
        (transport, connection, poller)
    }

    #[tokio::test]
    async fn test_read_now_replaces_snapshot() {
        let (transport, _, poller) = connected_poller().await;
        transport.set_status(Some(json!({
            "ultrasonic": 42.5,
            "battery": 7.4,
            "lineTracking": {"L": 1, "M": 0, "R": 1}
        })));

        let snapshot = poller.read_now().await.unwrap();
        assert_eq!(snapshot.ultrasonic, 42.5);
        assert_eq!(snapshot.battery, 7.4);
        assert_eq!(
            snapshot.line_tracking,
            LineTracking {
                left: 1,
                middle: 0,
                right: 1
            }
        );
        assert_eq!(poller.snapshot().await, snapshot);
    }

    #[tokio::test]
    async fn test_sparse_report_resets_missing_fields() {
        let (transport, _, poller) = connected_poller().await;
        transport.set_status(Some(json!({"ultrasonic": 10.0, "battery": 8.1})));
        poller.read_now().await.unwrap();

        transport.set_status(Some(json!({"battery": 7.0})));
        let snapshot = poller.read_now().await.unwrap();
        assert_eq!(snapshot.ultrasonic, 0.0);
        assert_eq!(snapshot.battery, 7.0);
        assert_eq!(snapshot.line_tracking, LineTracking::default());
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_previous_snapshot() {
        let (transport, _, poller) = connected_poller().await;
        transport.set_status(Some(json!({"ultrasonic": 25.0, "battery": 7.8})));
        let before = poller.read_now().await.unwrap();

        transport.set_status(None);
        assert!(matches!(poller.read_now().await, Err(TelemetryError::Fetch(_))));
        assert_eq!(poller.snapshot().await, before);

        transport.set_status(Some(json!("rebooting")));
        assert!(matches!(poller.read_now().await, Err(TelemetryError::Decode(_))));
        assert_eq!(poller.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_read_now_requires_connection() {
        let (transport, connection, poller) = connected_poller().await;
        connection.disconnect().await;

        assert!(matches!(poller.read_now().await, Err(TelemetryError::NotConnected)));
        assert_eq!(transport.status_fetches(), 0);
        assert_eq!(poller.snapshot().await, SensorSnapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_polling_and_stop() {
        let (transport, _, poller) = connected_poller().await;
        transport.set_status(Some(json!({"battery": 7.2})));

        let handle = poller.start();
        // First tick fires immediately, then every 500ms
        tokio::time::sleep(Duration::from_millis(1250)).await;
        assert_eq!(transport.status_fetches(), 3);
        assert_eq!(poller.snapshot().await.battery, 7.2);

        handle.stop();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(transport.status_fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_skips_while_disconnected() {
        let (transport, connection, poller) = connected_poller().await;
        connection.disconnect().await;

        let _handle = poller.start();
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(transport.status_fetches(), 0);

        connection.connect("192.168.4.1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(transport.status_fetches() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_survives_failures() {
        let (transport, _, poller) = connected_poller().await;
        transport.set_status(None);

        let _handle = poller.start();
        tokio::time::sleep(Duration::from_millis(1250)).await;
        assert_eq!(transport.status_fetches(), 3);
        assert_eq!(poller.snapshot().await, SensorSnapshot::default());
    }
}
