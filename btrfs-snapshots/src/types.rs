// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A subvolume whose basename parsed as a snapshot timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedSnapshot {
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
}

/// Result of a delete request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// The confirmation policy said no; the tool was never invoked.
    Declined,
}

/// Order snapshots oldest first. Ties keep their listing order.
pub fn sort_chronologically(snapshots: &mut [TimestampedSnapshot]) {
    snapshots.sort_by_key(|snapshot| snapshot.timestamp);
}
