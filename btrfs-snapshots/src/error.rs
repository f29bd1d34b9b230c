// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use thiserror::Error;

/// Error types for snapshot operations
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The btrfs tool ran and exited non-zero. `stderr` is passed through verbatim.
    #[error("{command} failed: {stderr}")]
    ToolInvocation { command: String, stderr: String },

    #[error("btrfs tool unavailable: {0}")]
    ToolUnavailable(String),

    /// The snapshot command succeeded but its confirmation text was not recognised.
    #[error("unrecognised snapshot confirmation: {0}")]
    CreateSnapshot(String),

    /// The delete command succeeded but its confirmation text was not recognised.
    #[error("unrecognised delete confirmation: {0}")]
    DeleteSnapshot(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid timestamp format: {0}")]
    InvalidTimestampFormat(String),

    #[error("config error for {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for snapshot operations
pub type Result<T> = std::result::Result<T, SnapshotError>;
