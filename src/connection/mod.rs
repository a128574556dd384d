//! Connection management for the robot endpoint
//!
//! This module handles:
//! - Normalizing the user-supplied endpoint
//! - The reachability probe that gates execution and polling
//! - Tracking Connected/Disconnected status

mod manager;

pub use manager::{
    normalize_endpoint, Connected, Connection, ConnectionError, ConnectionManager,
    ConnectionStatus,
};
