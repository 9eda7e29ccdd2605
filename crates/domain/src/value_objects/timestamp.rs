//! Microsecond-resolution UTC timestamps used for message ordering and cursors.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// A UTC instant truncated to whole microseconds.
///
/// Timestamps are exchanged as ISO-8601 strings with exactly six fractional
/// digits and an explicit `+00:00` offset, so a value rendered with
/// [`Timestamp::to_iso`] parses back to an identical `Timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The Unix epoch; the cursor used when a poller has seen nothing yet.
    pub const EPOCH: Timestamp = Timestamp(DateTime::<Utc>::UNIX_EPOCH);

    /// Truncates `at` to microsecond resolution.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let micros = at.timestamp_micros();
        // Every DateTime chrono can hold fits in i64 microseconds.
        Self(DateTime::from_timestamp_micros(micros).unwrap_or(at))
    }

    pub fn from_micros(micros: i64) -> Result<Self, DomainError> {
        DateTime::from_timestamp_micros(micros)
            .map(Self)
            .ok_or_else(|| DomainError::parse(format!("timestamp out of range: {micros}")))
    }

    pub fn as_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// The smallest timestamp strictly after this one.
    pub fn next_tick(&self) -> Self {
        Self(self.0 + chrono::Duration::microseconds(1))
    }

    /// This timestamp minus `duration`, saturating at the epoch.
    pub fn saturating_sub(&self, duration: std::time::Duration) -> Self {
        chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| self.0.checked_sub_signed(d))
            .map(Self::from_datetime)
            .filter(|t| *t > Self::EPOCH)
            .unwrap_or(Self::EPOCH)
    }

    pub fn to_iso(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    /// Parses an RFC 3339 timestamp with any offset.
    ///
    /// A space where the offset sign should be is read as `+`: unencoded
    /// `+00:00` offsets arrive that way through query strings.
    pub fn parse_iso(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        let repaired;
        let candidate = match trimmed.rfind(' ') {
            Some(idx) if idx > 10 => {
                repaired = format!("{}+{}", &trimmed[..idx], &trimmed[idx + 1..]);
                repaired.as_str()
            }
            _ => trimmed,
        };
        DateTime::parse_from_rfc3339(candidate)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|e| DomainError::parse(format!("invalid timestamp {input:?}: {e}")))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}

impl FromStr for Timestamp {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_iso(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse_iso(&s)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> String {
        ts.to_iso()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_datetime(at)
    }
}
