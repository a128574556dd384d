//! LED color and blink patterns

use super::{paced, Step};
use roverlink_shared::Instruction;
use std::time::Duration;

/// Plan an LED color change or blink pattern
///
/// A blink waits `delay_ms` after both the on and the off command.
pub fn plan(instruction: &Instruction) -> Vec<Step> {
    match *instruction {
        Instruction::BlinkLed { delay_ms, .. } => {
            paced(instruction.wire_commands(), Duration::from_millis(delay_ms))
        }
        _ => instruction
            .wire_commands()
            .into_iter()
            .map(Step::Transmit)
            .collect(),
    }
}
