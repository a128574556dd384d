//! Connection manager tracking reachability of the robot

use crate::transport::{Transport, TransportError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Errors raised while connecting
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("robot at {endpoint} is not reachable: {source}")]
    ProbeFailed {
        endpoint: String,
        #[source]
        source: TransportError,
    },
}

/// Reachability status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

/// Current connection state; the endpoint is set only while Connected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    pub endpoint: Option<String>,
    pub status: ConnectionStatus,
}

/// Proof of a successful probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connected {
    pub endpoint: String,
}

/// Owns the connection state for one robot
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    state: RwLock<Connection>,
}

impl ConnectionManager {
    /// Create a disconnected manager
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: RwLock::new(Connection::default()),
        }
    }

    /// Probe the endpoint once and record it on success
    ///
    /// Any failure leaves the manager Disconnected with no endpoint, even if
    /// it was previously connected elsewhere. No retry is attempted.
    pub async fn connect(&self, endpoint: &str) -> Result<Connected, ConnectionError> {
        let endpoint = match normalize_endpoint(endpoint) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                *self.state.write().await = Connection::default();
                return Err(e);
            }
        };

        match self.transport.probe(&endpoint).await {
            Ok(()) => {
                *self.state.write().await = Connection {
                    endpoint: Some(endpoint.clone()),
                    status: ConnectionStatus::Connected,
                };
                info!("Connected to robot at {} via {}", endpoint, self.transport.name());
                Ok(Connected { endpoint })
            }
            Err(source) => {
                *self.state.write().await = Connection::default();
                warn!("Connection to {} failed: {}", endpoint, source);
                Err(ConnectionError::ProbeFailed { endpoint, source })
            }
        }
    }

    /// Forget the endpoint
    pub async fn disconnect(&self) {
        let mut state = self.state.write().await;
        if state.status == ConnectionStatus::Connected {
            info!("Disconnected from robot");
        }
        *state = Connection::default();
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.status == ConnectionStatus::Connected
    }

    /// Endpoint of the current connection, if connected
    pub async fn endpoint(&self) -> Option<String> {
        self.state.read().await.endpoint.clone()
    }

    pub async fn snapshot(&self) -> Connection {
        self.state.read().await.clone()
    }
}

/// Turn user input (`192.168.4.1`, `robot.local:8080`, `http://...`) into a base URL
pub fn normalize_endpoint(input: &str) -> Result<String, ConnectionError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConnectionError::InvalidEndpoint {
            endpoint: input.to_string(),
            reason: "empty".into(),
        });
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = reqwest::Url::parse(&candidate).map_err(|e| ConnectionError::InvalidEndpoint {
        endpoint: input.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(ConnectionError::InvalidEndpoint {
            endpoint: input.to_string(),
            reason: "missing host".into(),
        });
    }

    Ok(candidate.trim_end_matches('/').to_string())
}
