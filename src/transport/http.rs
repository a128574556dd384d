//! HTTP transport for the robot's camera-server firmware
//!
//! Commands travel as a URL-encoded JSON object in a single query parameter:
//! ```text
//! GET {endpoint}/test1?var={"N":1,"D1":200,"T1":1000}
//! ```
//! Status is a plain `GET {endpoint}/status` returning JSON.

use crate::transport::traits::{Transport, TransportError};
use async_trait::async_trait;
use roverlink_shared::WireCommand;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Per-request timeout; `None` leaves requests unbounded
    pub request_timeout: Option<Duration>,
    /// Command endpoint path
    pub command_path: String,
    /// Query parameter carrying the serialized command
    pub command_param: String,
    /// Status endpoint path
    pub status_path: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            command_path: "/test1".into(),
            command_param: "var".into(),
            status_path: "/status".into(),
        }
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Unreachable(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str, path: &str) -> String {
        format!("{}{}", endpoint.trim_end_matches('/'), path)
    }

    async fn get_status(&self, endpoint: &str) -> Result<reqwest::Response, TransportError> {
        let url = self.url(endpoint, &self.config.status_path);
        let response = self.client.get(&url).send().await.map_err(map_reqwest_error)?;
        check_status(response).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self, endpoint: &str) -> Result<(), TransportError> {
        self.get_status(endpoint).await.map(|_| ())
    }

    async fn send_command(
        &self,
        endpoint: &str,
        command: &WireCommand,
    ) -> Result<Option<String>, TransportError> {
        let url = self.url(endpoint, &self.config.command_path);
        let payload = command.to_json()?;

        debug!(url = %url, command = %payload, "sending command");

        let response = self
            .client
            .get(&url)
            .query(&[(self.config.command_param.as_str(), payload.as_str())])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let text = check_status(response)
            .await?
            .text()
            .await
            .map_err(map_reqwest_error)?;

        Ok(if text.is_empty() { None } else { Some(text) })
    }

    async fn fetch_status(&self, endpoint: &str) -> Result<Value, TransportError> {
        self.get_status(endpoint)
            .await?
            .json::<Value>()
            .await
            .map_err(map_reqwest_error)
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}

/// Turn a non-success response into [`TransportError::Status`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Map a [`reqwest::Error`] to a [`TransportError`]
fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() {
        TransportError::InvalidBody(err.to_string())
    } else {
        TransportError::Unreachable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request head
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (endpoint, handle)
    }

    #[test]
    fn test_url_joins_path() {
        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();
        assert_eq!(
            transport.url("http://192.168.4.1/", "/status"),
            "http://192.168.4.1/status"
        );
        assert_eq!(transport.name(), "HTTP");
    }

    #[tokio::test]
    async fn test_command_is_url_encoded_in_query() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", "ok").await;
        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();

        let reply = transport
            .send_command(&endpoint, &WireCommand::stop())
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("ok"));

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert_eq!(request_line, "GET /test1?var=%7B%22N%22%3A100%7D HTTP/1.1");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (endpoint, server) = serve_once("HTTP/1.1 500 Internal Server Error", "boom").await;
        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();

        let err = transport.probe(&endpoint).await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, ref body } if body == "boom"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_status_decodes_json() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", r#"{"battery":7.9}"#).await;
        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();

        let report = transport.fetch_status(&endpoint).await.unwrap();
        assert_eq!(report["battery"], 7.9);
        assert!(server.await.unwrap().starts_with("GET /status HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_fetch_status_rejects_non_json() {
        let (endpoint, server) = serve_once("HTTP/1.1 200 OK", "<html>").await;
        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();

        let err = transport.fetch_status(&endpoint).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidBody(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();
        let err = transport.probe(&endpoint).await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }
}
