pub mod http;
#[cfg(test)]
pub mod mock;
pub mod traits;

pub use http::{HttpTransport, HttpTransportConfig};
pub use traits::{Transport, TransportError};
