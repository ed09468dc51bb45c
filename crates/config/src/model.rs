#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

/// A one-shot timer registered before the first step.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerSpec {
    pub name: String,

    /// Delay in milliseconds. Zero fires as soon as the timer is created.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(rename = "after_ms")]
    pub after: Duration,
}

/// A ticker registered before the first step.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickerSpec {
    pub name: String,

    /// Period in milliseconds, must be positive.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(rename = "period_ms")]
    pub period: Duration,
}

/// One call to `advance`.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    #[serde(rename = "advance_ms")]
    pub advance: Duration,
}

impl Step {
    pub fn new(advance: Duration) -> Self {
        Self {
            label: None,
            advance,
        }
    }
}
