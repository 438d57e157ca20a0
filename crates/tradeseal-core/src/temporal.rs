//! # UTC Timestamps
//!
//! Escrow windows are measured in whole seconds and credentials carry
//! issuance dates, so `Timestamp` is UTC-only and truncated to seconds.
//! It renders as `YYYY-MM-DDTHH:MM:SSZ`, which keeps canonical credential
//! bytes stable.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Seconds since the Unix epoch.
    pub fn from_unix_secs(secs: i64) -> Result<Self, ValidationError> {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .map(Self)
            .ok_or(ValidationError::OutOfRange {
                field: "timestamp",
                value: secs.to_string(),
            })
    }

    pub fn unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Parse RFC 3339 with a `Z` suffix. Explicit offsets, including
    /// `+00:00`, are rejected so every instant has one spelling.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::Malformed {
                field: "timestamp",
                reason: format!("must use Z suffix, got {s:?}"),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::Malformed {
            field: "timestamp",
            reason: e.to_string(),
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// This instant plus `secs` seconds, saturating at the representable
    /// range.
    pub fn plus_secs(&self, secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1_000);
        let delta = chrono::Duration::seconds(secs);
        self.0
            .checked_add_signed(delta)
            .map(Self)
            .unwrap_or(Self(DateTime::<Utc>::MAX_UTC))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}
