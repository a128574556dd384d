//! RoverLink Shared Protocol Types
//!
//! This crate provides the action model, wire codec and telemetry types used
//! to drive a networked robot car from an ordered list of high-level actions.

pub mod action;
pub mod codec;
pub mod state_machine;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use action::{Action, ActionKind, Param};
pub use codec::{encode, EncodingError, Instruction, WireCommand};
pub use state_machine::{
    EngineEvent, EngineState, EngineStateMachine, TransitionError, TransitionResult,
};
pub use telemetry::{DecodeError, LineTracking, SensorSnapshot};

/// Timing parameters shared by the engine and the poller
pub mod timing {
    /// Settle delay applied after every queued action
    pub const SETTLE_DELAY_MS: u64 = 50;

    /// Device status polling period
    pub const TELEMETRY_POLL_INTERVAL_MS: u64 = 500;

    /// Servo sweep step size in degrees
    pub const SWEEP_STEP_DEG: i64 = 10;
}

/// Device-facing defaults and limits
pub mod limits {
    /// Motor speed used when the action omits it
    pub const DEFAULT_SPEED: i64 = 200;

    /// Motion duration (seconds) used when the action omits it
    pub const DEFAULT_TIME_S: f64 = 1.0;

    /// Fixed speed the device uses for in-place turns
    pub const TURN_SPEED: i64 = 200;

    /// Highest accepted motor speed
    pub const MAX_SPEED: i64 = 255;

    /// Highest accepted servo angle
    pub const MAX_ANGLE: i64 = 180;

    /// Highest accepted LED channel value
    pub const MAX_COLOR: i64 = 255;

    /// Highest accepted blink count; each blink is two commands and two waits
    pub const MAX_BLINK_COUNT: i64 = 1000;

    /// Highest iteration count of one repeat block
    pub const MAX_REPEAT_COUNT: usize = 100;

    /// Upper bound on the length of an unrolled program
    pub const MAX_PROGRAM_ACTIONS: usize = 10_000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports_encode_stop() {
        let commands = encode(&Action::stop()).expect("stop encodes");
        assert_eq!(commands, vec![WireCommand::new(100)]);
    }
}
