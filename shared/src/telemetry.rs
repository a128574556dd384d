//! Sensor telemetry decoding
//!
//! The device status surface returns a JSON object. Only three sensor groups
//! are read from it; each missing or non-numeric field decodes to zero so a
//! sparse report still yields a complete snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors decoding a status report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("status report is not a JSON object: {0}")]
    NotAnObject(String),
}

/// Line tracking sensor triple (left, middle, right)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineTracking {
    #[serde(rename = "L")]
    pub left: i64,
    #[serde(rename = "M")]
    pub middle: i64,
    #[serde(rename = "R")]
    pub right: i64,
}

/// Latest sensor state, always replaced as a whole
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Ultrasonic distance in cm
    pub ultrasonic: f64,
    /// Battery voltage in V
    pub battery: f64,
    #[serde(rename = "lineTracking")]
    pub line_tracking: LineTracking,
}

impl SensorSnapshot {
    /// Decode a status report, defaulting any missing field to zero
    pub fn from_status(report: &Value) -> Result<Self, DecodeError> {
        let fields = report
            .as_object()
            .ok_or_else(|| DecodeError::NotAnObject(type_name(report).to_string()))?;

        let number = |key: &str| fields.get(key).and_then(Value::as_f64).unwrap_or(0.0);

        let line_tracking = match fields.get("lineTracking") {
            Some(Value::Object(lt)) => {
                let channel = |key: &str| lt.get(key).map(as_channel).unwrap_or(0);
                LineTracking {
                    left: channel("L"),
                    middle: channel("M"),
                    right: channel("R"),
                }
            }
            _ => LineTracking::default(),
        };

        Ok(Self {
            ultrasonic: number("ultrasonic"),
            battery: number("battery"),
            line_tracking,
        })
    }

    /// Read one line-tracking channel by its device key (`L`, `M` or `R`)
    pub fn line_sensor(&self, key: char) -> Option<i64> {
        match key.to_ascii_uppercase() {
            'L' => Some(self.line_tracking.left),
            'M' => Some(self.line_tracking.middle),
            'R' => Some(self.line_tracking.right),
            _ => None,
        }
    }
}

fn as_channel(value: &Value) -> i64 {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .unwrap_or(0)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_report() {
        let report = json!({
            "ultrasonic": 23.5,
            "battery": 7.4,
            "lineTracking": { "L": 1, "M": 0, "R": 512 }
        });
        let snapshot = SensorSnapshot::from_status(&report).unwrap();
        assert_eq!(snapshot.ultrasonic, 23.5);
        assert_eq!(snapshot.battery, 7.4);
        assert_eq!(
            snapshot.line_tracking,
            LineTracking { left: 1, middle: 0, right: 512 }
        );
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let snapshot = SensorSnapshot::from_status(&json!({ "battery": 8 })).unwrap();
        assert_eq!(snapshot.ultrasonic, 0.0);
        assert_eq!(snapshot.battery, 8.0);
        assert_eq!(snapshot.line_tracking, LineTracking::default());

        let partial = json!({ "lineTracking": { "M": 3 } });
        let snapshot = SensorSnapshot::from_status(&partial).unwrap();
        assert_eq!(snapshot.line_tracking, LineTracking { left: 0, middle: 3, right: 0 });
    }

    #[test]
    fn test_camera_status_decodes_as_empty_snapshot() {
        let report = json!({ "framesize": 8, "quality": 10 });
        assert_eq!(SensorSnapshot::from_status(&report).unwrap(), SensorSnapshot::default());
    }

    #[test]
    fn test_non_object_rejected() {
        let err = SensorSnapshot::from_status(&json!([1, 2])).unwrap_err();
        assert_eq!(err, DecodeError::NotAnObject("array".into()));
    }

    #[test]
    fn test_line_sensor_lookup() {
        let snapshot = SensorSnapshot {
            line_tracking: LineTracking { left: 1, middle: 2, right: 3 },
            ..Default::default()
        };
        assert_eq!(snapshot.line_sensor('L'), Some(1));
        assert_eq!(snapshot.line_sensor('m'), Some(2));
        assert_eq!(snapshot.line_sensor('R'), Some(3));
        assert_eq!(snapshot.line_sensor('X'), None);
    }

    #[test]
    fn test_serializes_in_device_shape() {
        let json = serde_json::to_value(SensorSnapshot::default()).unwrap();
        assert_eq!(
            json,
            json!({ "ultrasonic": 0.0, "battery": 0.0, "lineTracking": { "L": 0, "M": 0, "R": 0 } })
        );
    }
}
