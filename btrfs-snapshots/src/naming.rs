// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};

/// `YYYY_MM_DD_HH_MM_SS`
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// strftime pattern used to name snapshots after their creation time.
///
/// Only patterns that survive a format/parse round trip are accepted, so a
/// name produced by [`TimestampFormat::format`] always parses back to the same
/// instant and string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimestampFormat {
    pattern: String,
}

impl TimestampFormat {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();

        if pattern.is_empty()
            || StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error))
        {
            return Err(SnapshotError::InvalidTimestampFormat(pattern));
        }

        let format = Self { pattern };
        let probe = NaiveDateTime::parse_from_str("2017-08-14 20:44:21", "%Y-%m-%d %H:%M:%S")
            .map_err(|e| SnapshotError::InvalidTimestampFormat(e.to_string()))?;
        if format.parse(&format.format(&probe)) != Some(probe) {
            return Err(SnapshotError::InvalidTimestampFormat(format!(
                "'{}' does not round-trip to second precision",
                format.pattern
            )));
        }

        Ok(format)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn format(&self, timestamp: &NaiveDateTime) -> String {
        timestamp.format(&self.pattern).to_string()
    }

    /// Parse a snapshot basename.
    ///
    /// Returns `None` unless `name` is exactly what [`format`](Self::format)
    /// would produce, which rejects unpadded fields and trailing text.
    pub fn parse(&self, name: &str) -> Option<NaiveDateTime> {
        let timestamp = NaiveDateTime::parse_from_str(name, &self.pattern).ok()?;
        (self.format(&timestamp) == name).then_some(timestamp)
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl TryFrom<String> for TimestampFormat {
    type Error = SnapshotError;

    fn try_from(pattern: String) -> Result<Self> {
        Self::new(pattern)
    }
}

impl From<TimestampFormat> for String {
    fn from(format: TimestampFormat) -> Self {
        format.pattern
    }
}
