//! Drive commands: timed motions, stop, custom moves and raw motor control

use super::Step;
use roverlink_shared::Instruction;

/// Plan a single drive command
///
/// Timed motions hold the queue for their `T1` duration after sending so the
/// next command is not issued while the car is still moving.
pub fn plan(instruction: &Instruction) -> Vec<Step> {
    let mut steps = Vec::with_capacity(2);
    for cmd in instruction.wire_commands() {
        steps.push(Step::Transmit(cmd));
        if let Some(duration) = cmd.duration() {
            steps.push(Step::Wait(duration));
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use roverlink_shared::WireCommand;
    use std::time::Duration;

    #[test]
    fn test_timed_motion_waits_for_duration() {
        let steps = plan(&Instruction::MoveForward {
            speed: 200,
            duration_ms: 1500,
        });
        assert_eq!(
            steps,
            vec![
                Step::Transmit(WireCommand::new(1).with_d1(200).with_t1(1500)),
                Step::Wait(Duration::from_millis(1500)),
            ]
        );
    }

    #[test]
    fn test_turn_waits_for_duration() {
        let steps = plan(&Instruction::TurnLeft { duration_ms: 700 });
        assert_eq!(steps[1], Step::Wait(Duration::from_millis(700)));
    }

    #[test]
    fn test_untimed_commands_do_not_wait() {
        assert_eq!(plan(&Instruction::Stop), vec![Step::Transmit(WireCommand::stop())]);

        let steps = plan(&Instruction::ControlMotor {
            motor: 3,
            direction: 1,
            speed: 90,
        });
        assert_eq!(steps.len(), 1);

        let steps = plan(&Instruction::MoveCustom {
            direction: 2,
            speed: 150,
        });
        assert_eq!(steps, vec![Step::Transmit(WireCommand::new(2).with_d1(150))]);
    }
}
