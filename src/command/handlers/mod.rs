//! Step planners for each action family
//!
//! A plan is the exact sequence of transmissions and passive waits the engine
//! performs for one queued action. Compound actions are expanded here rather
//! than in the codec because every step is transmitted and delayed on its own.

mod control;
mod lighting;
mod motion;
mod servo;

use roverlink_shared::{Action, EncodingError, Instruction, WireCommand};
use std::time::Duration;

/// One unit of work inside an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Send a command and wait for the device's response
    Transmit(WireCommand),
    /// Passive wait, never interrupted by cancellation
    Wait(Duration),
}

/// Validate an action and expand it into steps
pub fn plan(action: &Action) -> Result<Vec<Step>, EncodingError> {
    let instruction = Instruction::try_from(action)?;

    let steps = match instruction {
        Instruction::MoveForward { .. }
        | Instruction::MoveBackward { .. }
        | Instruction::TurnLeft { .. }
        | Instruction::TurnRight { .. }
        | Instruction::Stop
        | Instruction::MoveCustom { .. }
        | Instruction::ControlMotor { .. } => motion::plan(&instruction),
        Instruction::ControlServo { .. } | Instruction::SweepServo { .. } => servo::plan(&instruction),
        Instruction::SetLedColor { .. } | Instruction::BlinkLed { .. } => lighting::plan(&instruction),
        Instruction::Wait { duration_ms } => control::plan_wait(duration_ms),
    };

    Ok(steps)
}

/// Every command followed by the same fixed wait
fn paced(commands: Vec<WireCommand>, wait: Duration) -> Vec<Step> {
    commands
        .into_iter()
        .flat_map(|cmd| [Step::Transmit(cmd), Step::Wait(wait)])
        .collect()
}

/// Number of wire commands in a plan
pub fn transmissions(steps: &[Step]) -> usize {
    steps
        .iter()
        .filter(|step| matches!(step, Step::Transmit(_)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_rejects_malformed_action() {
        let action = Action::new(roverlink_shared::ActionKind::BlinkLed, vec![]);
        assert!(matches!(plan(&action), Err(EncodingError::Arity { .. })));
    }

    #[test]
    fn test_transmission_count() {
        let steps = plan(&Action::sweep_servo(2.0, 180.0, 0.0, 100.0)).unwrap();
        assert_eq!(transmissions(&steps), 19);
        assert_eq!(steps.len(), 38);
    }
}
