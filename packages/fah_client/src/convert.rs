//! Conversion pipeline: one wire value in, one typed value out.
//!
//! Every function here is pure. Sentinel wire values map to `None` rather than
//! to an error: epoch `0` for timestamps and the literal `<invalid>` for
//! calendar strings.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::FormatError;

/// Calendar string the peer sends when it has no date to report.
pub const INVALID_DATE_SENTINEL: &str = "<invalid>";

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// `27/Aug/2011-12:00:00`
const LEGACY_FORMAT: &str = "%d/%b/%Y-%H:%M:%S";

/// Status of a folding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Paused,
    Running,
    Finishing,
    Send,
}

impl SlotStatus {
    pub fn token(&self) -> &'static str {
        match self {
            SlotStatus::Paused => "PAUSED",
            SlotStatus::Running => "RUNNING",
            SlotStatus::Finishing => "FINISHING",
            SlotStatus::Send => "SEND",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl std::str::FromStr for SlotStatus {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        status(s)
    }
}

/// Seconds since the Unix epoch; `0` means "no value".
pub fn epoch_timestamp(secs: i64) -> Result<Option<DateTime<Utc>>, FormatError> {
    if secs == 0 {
        return Ok(None);
    }
    DateTime::from_timestamp(secs, 0)
        .map(Some)
        .ok_or(FormatError::EpochOutOfRange { value: secs })
}

/// Whole seconds to a duration. Zero is a valid duration, not a sentinel.
pub fn duration_secs(secs: i64) -> Result<Duration, FormatError> {
    Duration::try_seconds(secs).ok_or_else(|| FormatError::UnexpectedValue {
        expected: "duration in seconds",
        value: secs.to_string(),
    })
}

/// ISO-8601 first, then the legacy `DD/Mon/YYYY-HH:MM:SS` form.
pub fn calendar_timestamp(s: &str) -> Result<Option<DateTime<Utc>>, FormatError> {
    let s = s.trim();
    if s == INVALID_DATE_SENTINEL {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    let naive = s.strip_suffix('Z').unwrap_or(s);
    if let Ok(dt) = NaiveDateTime::parse_from_str(naive, ISO_FORMAT) {
        return Ok(Some(dt.and_utc()));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, LEGACY_FORMAT) {
        return Ok(Some(dt.and_utc()));
    }
    Err(FormatError::InvalidTimestamp {
        value: s.to_string(),
    })
}

/// Dotted IPv4, IPv6, or a single `0x`-prefixed IPv4 integer.
pub fn network_address(s: &str) -> Result<IpAddr, FormatError> {
    let trimmed = s.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(addr) => Ok(addr),
        Err(source) => trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .map(|raw| IpAddr::V4(Ipv4Addr::from(raw)))
            .ok_or(FormatError::InvalidAddress {
                value: s.to_string(),
                source,
            }),
    }
}

pub fn status(s: &str) -> Result<SlotStatus, FormatError> {
    match s {
        "PAUSED" => Ok(SlotStatus::Paused),
        "RUNNING" => Ok(SlotStatus::Running),
        "FINISHING" => Ok(SlotStatus::Finishing),
        "SEND" => Ok(SlotStatus::Send),
        other => Err(FormatError::UnknownStatus {
            value: other.to_string(),
        }),
    }
}

/// A JSON integer or a decimal string such as `"32"`.
pub fn integer(value: &Value) -> Result<i64, FormatError> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| unexpected("integer", value))
}

/// A JSON number or a numeric string.
pub fn float(value: &Value) -> Result<f64, FormatError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| unexpected("number", value))
}

/// A JSON bool or the strings `true`/`false`.
pub fn boolean(value: &Value) -> Result<bool, FormatError> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
    .ok_or_else(|| unexpected("boolean", value))
}

/// `"12.50%"` to `12.5`.
pub fn percent(s: &str) -> Result<f64, FormatError> {
    s.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .map_err(|_| FormatError::UnexpectedValue {
            expected: "percentage",
            value: s.to_string(),
        })
}

pub(crate) fn unexpected(expected: &'static str, value: &Value) -> FormatError {
    FormatError::UnexpectedValue {
        expected,
        value: value.to_string(),
    }
}
