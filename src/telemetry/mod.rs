//! Sensor telemetry polling
//!
//! Periodically reads the device status surface and keeps the latest
//! [`SensorSnapshot`](roverlink_shared::SensorSnapshot) for readers.

mod poller;

pub use poller::{PollerConfig, PollerHandle, TelemetryError, TelemetryPoller};
