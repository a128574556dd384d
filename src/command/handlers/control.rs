//! Flow control actions

use super::Step;
use std::time::Duration;

/// A wait sends nothing to the device
pub fn plan_wait(duration_ms: u64) -> Vec<Step> {
    vec![Step::Wait(Duration::from_millis(duration_ms))]
}
