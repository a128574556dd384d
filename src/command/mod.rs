//! Action execution for the robot
//!
//! This module handles:
//! - Expanding each action into transmissions and waits
//! - Running the action queue with settle delays between actions
//! - Cooperative cancellation with an immediate Stop
//! - Tracking whether a run is in progress

mod executor;
pub mod handlers;

pub use executor::{
    EngineConfig, EngineError, ExecutionEngine, ExecutionSession, RunOutcome, SessionProgress,
};
