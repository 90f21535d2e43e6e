//! Capture intervals: `<count><unit>` strings such as `"30s"`, `"10m"`, `"1h"`.
//!
//! Relays store and report intervals in this textual form; the agent turns
//! them into a `Duration` to schedule its polling.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cadence for a relay looked up by id that is not yet claimed.
pub const DEFAULT_RELAY_INTERVAL: &str = "30s";

/// Default cadence reported for a claimed relay looked up by pairing code
/// when no interval has been configured.
pub const DEFAULT_PAIRING_INTERVAL: &str = "10m";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    #[error("interval is empty")]
    Empty,

    #[error("interval {0:?} must be a positive whole number followed by s, m or h")]
    Malformed(String),

    #[error("interval {0:?} must be greater than zero")]
    Zero(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Seconds,
    Minutes,
    Hours,
}

impl Unit {
    const fn suffix(self) -> char {
        match self {
            Self::Seconds => 's',
            Self::Minutes => 'm',
            Self::Hours => 'h',
        }
    }

    const fn seconds(self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
        }
    }
}

/// A validated capture interval. Keeps the unit it was written in so it
/// round-trips to the same string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaptureInterval {
    count: u64,
    unit: Unit,
}

impl CaptureInterval {
    pub const fn as_duration(&self) -> Duration {
        Duration::from_secs(self.count.saturating_mul(self.unit.seconds()))
    }
}

impl FromStr for CaptureInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(last) = s.chars().last() else {
            return Err(IntervalError::Empty);
        };
        let unit = match last {
            's' => Unit::Seconds,
            'm' => Unit::Minutes,
            'h' => Unit::Hours,
            _ => return Err(IntervalError::Malformed(s.to_string())),
        };
        let digits = &s[..s.len() - 1];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IntervalError::Malformed(s.to_string()));
        }
        let count: u64 = digits
            .parse()
            .map_err(|_| IntervalError::Malformed(s.to_string()))?;
        if count == 0 {
            return Err(IntervalError::Zero(s.to_string()));
        }
        Ok(Self { count, unit })
    }
}

impl TryFrom<String> for CaptureInterval {
    type Error = IntervalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CaptureInterval> for String {
    fn from(value: CaptureInterval) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CaptureInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

/// Parse an interval string straight into a `Duration`.
pub fn parse_interval(s: &str) -> Result<Duration, IntervalError> {
    s.parse::<CaptureInterval>().map(|i| i.as_duration())
}
