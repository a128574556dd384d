//! Wire codec for the robot's command endpoint
//!
//! Every action is lowered to one or more [`WireCommand`]s, each a sparse
//! key/value object:
//! ```text
//! { "N": opcode, "D1".."D4": optional args, "T1": optional duration (ms) }
//! ```
//!
//! Absent fields are omitted from the serialized object entirely. Opcodes
//! must match the device firmware exactly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::action::{Action, ActionKind, Param};
use crate::limits::{
    DEFAULT_SPEED, DEFAULT_TIME_S, MAX_ANGLE, MAX_BLINK_COUNT, MAX_COLOR, MAX_SPEED, TURN_SPEED,
};
use crate::timing::SWEEP_STEP_DEG;

/// Device opcodes
pub mod opcode {
    pub const MOVE_FORWARD: i64 = 1;
    pub const MOVE_BACKWARD: i64 = 2;
    pub const TURN_LEFT: i64 = 3;
    pub const TURN_RIGHT: i64 = 4;
    pub const CONTROL_SERVO: i64 = 4;
    pub const SET_LED: i64 = 5;
    pub const CONTROL_MOTOR: i64 = 1;
    pub const STOP: i64 = 100;
}

/// Errors raised when an action's parameters don't fit its kind
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    #[error("{kind} expects {expected} parameter(s), got {actual}")]
    Arity {
        kind: ActionKind,
        expected: &'static str,
        actual: usize,
    },

    #[error("{kind}: parameter `{field}` must be a number, got {value}")]
    WrongType {
        kind: ActionKind,
        field: &'static str,
        value: String,
    },

    #[error("{kind}: parameter `{field}` is not a finite number")]
    NotFinite { kind: ActionKind, field: &'static str },

    #[error("{kind}: parameter `{field}` = {value} is outside {min}..={max}")]
    OutOfRange {
        kind: ActionKind,
        field: &'static str,
        value: f64,
        min: i64,
        max: i64,
    },

    #[error("{kind}: parameter `{field}` must not be negative, got {value}")]
    Negative {
        kind: ActionKind,
        field: &'static str,
        value: f64,
    },
}

/// The exact object sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireCommand {
    #[serde(rename = "N")]
    pub n: i64,
    #[serde(rename = "D1", default, skip_serializing_if = "Option::is_none")]
    pub d1: Option<i64>,
    #[serde(rename = "D2", default, skip_serializing_if = "Option::is_none")]
    pub d2: Option<i64>,
    #[serde(rename = "D3", default, skip_serializing_if = "Option::is_none")]
    pub d3: Option<i64>,
    #[serde(rename = "D4", default, skip_serializing_if = "Option::is_none")]
    pub d4: Option<i64>,
    #[serde(rename = "T1", default, skip_serializing_if = "Option::is_none")]
    pub t1: Option<u64>,
}

impl WireCommand {
    /// A command carrying only an opcode
    pub fn new(n: i64) -> Self {
        Self {
            n,
            ..Default::default()
        }
    }

    pub fn with_d1(mut self, value: i64) -> Self {
        self.d1 = Some(value);
        self
    }

    pub fn with_d2(mut self, value: i64) -> Self {
        self.d2 = Some(value);
        self
    }

    pub fn with_d3(mut self, value: i64) -> Self {
        self.d3 = Some(value);
        self
    }

    pub fn with_d4(mut self, value: i64) -> Self {
        self.d4 = Some(value);
        self
    }

    pub fn with_t1(mut self, millis: u64) -> Self {
        self.t1 = Some(millis);
        self
    }

    pub fn stop() -> Self {
        Self::new(opcode::STOP)
    }

    pub fn control_servo(servo: i64, angle: i64) -> Self {
        Self::new(opcode::CONTROL_SERVO).with_d1(servo).with_d2(angle)
    }

    pub fn set_led_color(r: i64, g: i64, b: i64) -> Self {
        Self::new(opcode::SET_LED)
            .with_d1(1)
            .with_d2(r)
            .with_d3(g)
            .with_d4(b)
    }

    /// Duration the device runs this command for, if timed
    pub fn duration(&self) -> Option<Duration> {
        self.t1.map(Duration::from_millis)
    }

    /// Serialize to the flat JSON object carried in the `var` query parameter
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for WireCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{N:{}", self.n)?;
        let fields = [
            ("D1", self.d1),
            ("D2", self.d2),
            ("D3", self.d3),
            ("D4", self.d4),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                write!(f, ",{}:{}", name, v)?;
            }
        }
        if let Some(t1) = self.t1 {
            write!(f, ",T1:{}", t1)?;
        }
        f.write_str("}")
    }
}

/// A validated, typed view of an [`Action`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    MoveForward { speed: i64, duration_ms: u64 },
    MoveBackward { speed: i64, duration_ms: u64 },
    TurnLeft { duration_ms: u64 },
    TurnRight { duration_ms: u64 },
    Stop,
    ControlServo { servo: i64, angle: i64 },
    SweepServo {
        servo: i64,
        start: i64,
        end: i64,
        step_delay_ms: u64,
    },
    SetLedColor { r: i64, g: i64, b: i64 },
    BlinkLed {
        r: i64,
        g: i64,
        b: i64,
        count: u32,
        delay_ms: u64,
    },
    Wait { duration_ms: u64 },
    MoveCustom { direction: i64, speed: i64 },
    ControlMotor { motor: i64, direction: i64, speed: i64 },
}

impl Instruction {
    /// Lower to the ordered wire commands the device receives
    pub fn wire_commands(&self) -> Vec<WireCommand> {
        match *self {
            Instruction::MoveForward { speed, duration_ms } => vec![WireCommand::new(
                opcode::MOVE_FORWARD,
            )
            .with_d1(speed)
            .with_t1(duration_ms)],
            Instruction::MoveBackward { speed, duration_ms } => vec![WireCommand::new(
                opcode::MOVE_BACKWARD,
            )
            .with_d1(speed)
            .with_t1(duration_ms)],
            Instruction::TurnLeft { duration_ms } => vec![WireCommand::new(opcode::TURN_LEFT)
                .with_d1(TURN_SPEED)
                .with_t1(duration_ms)],
            Instruction::TurnRight { duration_ms } => vec![WireCommand::new(opcode::TURN_RIGHT)
                .with_d1(TURN_SPEED)
                .with_t1(duration_ms)],
            Instruction::Stop => vec![WireCommand::stop()],
            Instruction::ControlServo { servo, angle } => {
                vec![WireCommand::control_servo(servo, angle)]
            }
            Instruction::SweepServo {
                servo, start, end, ..
            } => sweep_angles(start, end)
                .into_iter()
                .map(|angle| WireCommand::control_servo(servo, angle))
                .collect(),
            Instruction::SetLedColor { r, g, b } => vec![WireCommand::set_led_color(r, g, b)],
            Instruction::BlinkLed { r, g, b, count, .. } => (0..count)
                .flat_map(|_| {
                    [
                        WireCommand::set_led_color(r, g, b),
                        WireCommand::set_led_color(0, 0, 0),
                    ]
                })
                .collect(),
            Instruction::Wait { .. } => Vec::new(),
            Instruction::MoveCustom { direction, speed } => {
                vec![WireCommand::new(direction).with_d1(speed)]
            }
            Instruction::ControlMotor {
                motor,
                direction,
                speed,
            } => vec![WireCommand::new(opcode::CONTROL_MOTOR)
                .with_d1(motor)
                .with_d2(direction)
                .with_d3(speed)],
        }
    }
}

impl TryFrom<&Action> for Instruction {
    type Error = EncodingError;

    fn try_from(action: &Action) -> Result<Self, Self::Error> {
        let args = Args::new(action);

        let instruction = match action.kind {
            ActionKind::MoveForward | ActionKind::MoveBackward => {
                args.arity(0, 2, "0 to 2")?;
                let speed = match args.optional_number(0, "speed")? {
                    Some(v) => args.ranged(v, "speed", 0, MAX_SPEED)?,
                    None => DEFAULT_SPEED,
                };
                let duration_ms = args.seconds_or_default(1, "time")?;
                if action.kind == ActionKind::MoveForward {
                    Instruction::MoveForward { speed, duration_ms }
                } else {
                    Instruction::MoveBackward { speed, duration_ms }
                }
            }
            ActionKind::TurnLeft | ActionKind::TurnRight => {
                args.arity(0, 1, "0 or 1")?;
                let duration_ms = args.seconds_or_default(0, "time")?;
                if action.kind == ActionKind::TurnLeft {
                    Instruction::TurnLeft { duration_ms }
                } else {
                    Instruction::TurnRight { duration_ms }
                }
            }
            ActionKind::Stop => {
                args.arity(0, 0, "0")?;
                Instruction::Stop
            }
            ActionKind::ControlServo => {
                args.arity(2, 2, "2")?;
                Instruction::ControlServo {
                    servo: args.integer(0, "servo")?,
                    angle: args.ranged_at(1, "angle", 0, MAX_ANGLE)?,
                }
            }
            ActionKind::SweepServo => {
                args.arity(4, 4, "4")?;
                Instruction::SweepServo {
                    servo: args.integer(0, "servo")?,
                    start: args.ranged_at(1, "startAngle", 0, MAX_ANGLE)?,
                    end: args.ranged_at(2, "endAngle", 0, MAX_ANGLE)?,
                    step_delay_ms: args.millis(3, "stepDelayMs")?,
                }
            }
            ActionKind::SetLedColor => {
                args.arity(3, 3, "3")?;
                Instruction::SetLedColor {
                    r: args.ranged_at(0, "r", 0, MAX_COLOR)?,
                    g: args.ranged_at(1, "g", 0, MAX_COLOR)?,
                    b: args.ranged_at(2, "b", 0, MAX_COLOR)?,
                }
            }
            ActionKind::BlinkLed => {
                args.arity(5, 5, "5")?;
                let count = args.non_negative(args.number(3, "count")?, "count")?;
                let count = args.ranged(count, "count", 0, MAX_BLINK_COUNT)?;
                Instruction::BlinkLed {
                    r: args.ranged_at(0, "r", 0, MAX_COLOR)?,
                    g: args.ranged_at(1, "g", 0, MAX_COLOR)?,
                    b: args.ranged_at(2, "b", 0, MAX_COLOR)?,
                    count: count as u32,
                    delay_ms: args.millis(4, "delayMs")?,
                }
            }
            ActionKind::Wait => {
                args.arity(1, 1, "1")?;
                let seconds = args.non_negative(args.number(0, "seconds")?, "seconds")?;
                Instruction::Wait {
                    duration_ms: seconds_to_ms(seconds),
                }
            }
            ActionKind::MoveCustom => {
                args.arity(2, 2, "2")?;
                Instruction::MoveCustom {
                    direction: args.direction(0)?,
                    speed: args.ranged_at(1, "speed", 0, MAX_SPEED)?,
                }
            }
            ActionKind::ControlMotor => {
                args.arity(3, 3, "3")?;
                Instruction::ControlMotor {
                    motor: args.integer(0, "motor")?,
                    direction: args.integer(1, "direction")?,
                    speed: args.ranged_at(2, "speed", 0, MAX_SPEED)?,
                }
            }
        };

        Ok(instruction)
    }
}

/// Encode an action into the ordered wire commands it produces
///
/// Compound actions yield one command per step; `Wait` yields none.
pub fn encode(action: &Action) -> Result<Vec<WireCommand>, EncodingError> {
    Ok(Instruction::try_from(action)?.wire_commands())
}

/// Servo angles visited by a sweep, both ends inclusive
///
/// Steps are 10 degrees toward `end`; the final step lands exactly on `end`
/// even when the span is not a multiple of the step size.
pub fn sweep_angles(start: i64, end: i64) -> Vec<i64> {
    let span = (end - start).abs();
    let steps = (span + SWEEP_STEP_DEG - 1) / SWEEP_STEP_DEG;
    let step = if end >= start {
        SWEEP_STEP_DEG
    } else {
        -SWEEP_STEP_DEG
    };

    (0..=steps)
        .map(|i| if i == steps { end } else { start + step * i })
        .collect()
}

fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

/// Positional parameter accessor for one action
struct Args<'a> {
    kind: ActionKind,
    params: &'a [Param],
}

impl<'a> Args<'a> {
    fn new(action: &'a Action) -> Self {
        Self {
            kind: action.kind,
            params: &action.params,
        }
    }

    fn arity(&self, min: usize, max: usize, expected: &'static str) -> Result<(), EncodingError> {
        let actual = self.params.len();
        if actual < min || actual > max {
            return Err(EncodingError::Arity {
                kind: self.kind,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn optional_number(&self, index: usize, field: &'static str) -> Result<Option<f64>, EncodingError> {
        match self.params.get(index) {
            None => Ok(None),
            Some(Param::Number(n)) if n.is_finite() => Ok(Some(*n)),
            Some(Param::Number(_)) => Err(EncodingError::NotFinite {
                kind: self.kind,
                field,
            }),
            Some(Param::Text(s)) => Err(EncodingError::WrongType {
                kind: self.kind,
                field,
                value: format!("{:?}", s),
            }),
        }
    }

    fn number(&self, index: usize, field: &'static str) -> Result<f64, EncodingError> {
        // arity() has already guaranteed presence
        self.optional_number(index, field)?
            .ok_or(EncodingError::Arity {
                kind: self.kind,
                expected: "more",
                actual: self.params.len(),
            })
    }

    fn integer(&self, index: usize, field: &'static str) -> Result<i64, EncodingError> {
        Ok(self.number(index, field)?.round() as i64)
    }

    fn ranged(&self, value: f64, field: &'static str, min: i64, max: i64) -> Result<i64, EncodingError> {
        let rounded = value.round() as i64;
        if rounded < min || rounded > max {
            return Err(EncodingError::OutOfRange {
                kind: self.kind,
                field,
                value,
                min,
                max,
            });
        }
        Ok(rounded)
    }

    fn ranged_at(&self, index: usize, field: &'static str, min: i64, max: i64) -> Result<i64, EncodingError> {
        let value = self.number(index, field)?;
        self.ranged(value, field, min, max)
    }

    fn non_negative(&self, value: f64, field: &'static str) -> Result<f64, EncodingError> {
        if value < 0.0 {
            return Err(EncodingError::Negative {
                kind: self.kind,
                field,
                value,
            });
        }
        Ok(value)
    }

    fn millis(&self, index: usize, field: &'static str) -> Result<u64, EncodingError> {
        let value = self.non_negative(self.number(index, field)?, field)?;
        Ok(value.round() as u64)
    }

    fn seconds_or_default(&self, index: usize, field: &'static str) -> Result<u64, EncodingError> {
        let seconds = match self.optional_number(index, field)? {
            Some(v) => self.non_negative(v, field)?,
            None => DEFAULT_TIME_S,
        };
        Ok(seconds_to_ms(seconds))
    }

    /// Direction doubles as the opcode; the editor may hand it over as text
    fn direction(&self, index: usize) -> Result<i64, EncodingError> {
        match self.params.get(index) {
            Some(Param::Text(s)) => s.trim().parse::<i64>().map_err(|_| EncodingError::WrongType {
                kind: self.kind,
                field: "direction",
                value: format!("{:?}", s),
            }),
            _ => self.integer(index, "direction"),
        }
    }
}
