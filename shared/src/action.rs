//! Action model
//!
//! An [`Action`] is one queueable robot instruction as produced by the program
//! editor: a closed [`ActionKind`] plus an ordered list of raw parameters.
//! Parameters are validated only when the action is encoded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of robot instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    Stop,
    ControlServo,
    SweepServo,
    #[serde(rename = "setLEDColor")]
    SetLedColor,
    #[serde(rename = "blinkLED")]
    BlinkLed,
    Wait,
    MoveCustom,
    ControlMotor,
}

impl ActionKind {
    /// All kinds, in editor toolbox order
    pub const ALL: [ActionKind; 12] = [
        ActionKind::MoveForward,
        ActionKind::MoveBackward,
        ActionKind::TurnLeft,
        ActionKind::TurnRight,
        ActionKind::Stop,
        ActionKind::MoveCustom,
        ActionKind::ControlMotor,
        ActionKind::ControlServo,
        ActionKind::SweepServo,
        ActionKind::SetLedColor,
        ActionKind::BlinkLed,
        ActionKind::Wait,
    ];

    /// Method name used by the program editor (`robot.<name>(...)`)
    pub fn method_name(self) -> &'static str {
        match self {
            ActionKind::MoveForward => "moveForward",
            ActionKind::MoveBackward => "moveBackward",
            ActionKind::TurnLeft => "turnLeft",
            ActionKind::TurnRight => "turnRight",
            ActionKind::Stop => "stop",
            ActionKind::ControlServo => "controlServo",
            ActionKind::SweepServo => "sweepServo",
            ActionKind::SetLedColor => "setLEDColor",
            ActionKind::BlinkLed => "blinkLED",
            ActionKind::Wait => "wait",
            ActionKind::MoveCustom => "moveCustom",
            ActionKind::ControlMotor => "controlMotor",
        }
    }

    /// Look up a kind by its editor method name
    pub fn from_method(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.method_name() == name)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// A raw action parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Number(f64),
    Text(String),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{}", *n as i64),
            Param::Number(n) => write!(f, "{}", n),
            Param::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// One queueable robot instruction
///
/// Serialized in the editor's command shape: `{"method": "...", "params": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "method")]
    pub kind: ActionKind,
    #[serde(default)]
    pub params: Vec<Param>,
}

impl Action {
    pub fn new(kind: ActionKind, params: Vec<Param>) -> Self {
        Self { kind, params }
    }

    fn numeric(kind: ActionKind, values: &[f64]) -> Self {
        Self::new(kind, values.iter().copied().map(Param::Number).collect())
    }

    pub fn move_forward(speed: f64, time_s: f64) -> Self {
        Self::numeric(ActionKind::MoveForward, &[speed, time_s])
    }

    pub fn move_backward(speed: f64, time_s: f64) -> Self {
        Self::numeric(ActionKind::MoveBackward, &[speed, time_s])
    }

    pub fn turn_left(time_s: f64) -> Self {
        Self::numeric(ActionKind::TurnLeft, &[time_s])
    }

    pub fn turn_right(time_s: f64) -> Self {
        Self::numeric(ActionKind::TurnRight, &[time_s])
    }

    pub fn stop() -> Self {
        Self::new(ActionKind::Stop, Vec::new())
    }

    pub fn control_servo(servo: f64, angle: f64) -> Self {
        Self::numeric(ActionKind::ControlServo, &[servo, angle])
    }

    pub fn sweep_servo(servo: f64, start: f64, end: f64, step_delay_ms: f64) -> Self {
        Self::numeric(ActionKind::SweepServo, &[servo, start, end, step_delay_ms])
    }

    pub fn set_led_color(r: f64, g: f64, b: f64) -> Self {
        Self::numeric(ActionKind::SetLedColor, &[r, g, b])
    }

    pub fn blink_led(r: f64, g: f64, b: f64, count: f64, delay_ms: f64) -> Self {
        Self::numeric(ActionKind::BlinkLed, &[r, g, b, count, delay_ms])
    }

    pub fn wait(seconds: f64) -> Self {
        Self::numeric(ActionKind::Wait, &[seconds])
    }

    pub fn move_custom(direction: f64, speed: f64) -> Self {
        Self::numeric(ActionKind::MoveCustom, &[direction, speed])
    }

    pub fn control_motor(motor: f64, direction: f64, speed: f64) -> Self {
        Self::numeric(ActionKind::ControlMotor, &[motor, direction, speed])
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")
    }
}
