//! # Temporal Types — Issuance Timestamps
//!
//! Defines [`Timestamp`], a UTC instant with millisecond precision. Chain
//! block timestamps are Unix milliseconds; credential `issuanceDate` values
//! are ISO 8601 strings. Verification compares the two after rounding each
//! to whole seconds (half-up), so sub-second rendering differences never
//! fail a proof.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::VerificationError;

/// A UTC instant with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    /// From a `chrono` UTC value, truncated to milliseconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis()).unwrap_or(Self(dt))
    }

    /// From Unix milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Structure`] for values outside chrono's
    /// representable range.
    pub fn from_millis(millis: i64) -> Result<Self, VerificationError> {
        DateTime::from_timestamp_millis(millis)
            .map(Self)
            .ok_or_else(|| VerificationError::Structure(format!("timestamp {millis} ms is out of range")))
    }

    /// Parse an ISO 8601 date.
    ///
    /// RFC 3339 strings with any offset are converted to UTC. Strings without
    /// an offset are read as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Structure`] for unparseable input.
    pub fn parse(value: &str) -> Result<Self, VerificationError> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self::from_utc(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Self::from_utc(naive.and_utc()))
            .map_err(|e| VerificationError::Structure(format!("invalid date {value:?}: {e}")))
    }

    /// Unix milliseconds.
    pub fn millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Whole seconds, rounding half up.
    pub fn rounded_secs(&self) -> i64 {
        (self.millis() + 500).div_euclid(1000)
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
