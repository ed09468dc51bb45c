#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::SystemTime;

#[serde_as]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClockSettings {
    /// Start of virtual time in milliseconds since the Unix epoch.
    ///
    /// Unset means the current system time.
    #[serde_as(as = "Option<serde_with::TimestampMilliSeconds<i64>>")]
    #[serde(rename = "start_unix_ms", skip_serializing_if = "Option::is_none")]
    pub start: Option<SystemTime>,
}

impl ClockSettings {
    pub fn start_or_now(&self) -> SystemTime {
        self.start.unwrap_or_else(SystemTime::now)
    }
}
