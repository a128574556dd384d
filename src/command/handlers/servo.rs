//! Servo positioning and sweeps

use super::{paced, Step};
use roverlink_shared::Instruction;
use std::time::Duration;

/// Plan a servo positioning or sweep
///
/// Every sweep step, including the last, is followed by the step delay.
pub fn plan(instruction: &Instruction) -> Vec<Step> {
    match *instruction {
        Instruction::SweepServo { step_delay_ms, .. } => {
            paced(instruction.wire_commands(), Duration::from_millis(step_delay_ms))
        }
        _ => instruction
            .wire_commands()
            .into_iter()
            .map(Step::Transmit)
            .collect(),
    }
}
