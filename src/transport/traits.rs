//! Transport trait abstraction for the robot's HTTP surfaces

use async_trait::async_trait;
use roverlink_shared::WireCommand;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by a transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    #[error("device returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    InvalidBody(String),

    #[error("cannot serialize command: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Request/response access to one robot endpoint
///
/// Each call is a single independent request; implementations must not
/// retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reachability probe against the status surface
    async fn probe(&self, endpoint: &str) -> Result<(), TransportError>;

    /// Send one command envelope, returning the response text if any
    async fn send_command(
        &self,
        endpoint: &str,
        command: &WireCommand,
    ) -> Result<Option<String>, TransportError>;

    /// Fetch the device status report
    async fn fetch_status(&self, endpoint: &str) -> Result<Value, TransportError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
