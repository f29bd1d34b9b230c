// SPDX-License-Identifier: GPL-3.0-only

//! Timestamped BTRFS snapshot management
//!
//! This library drives `btrfs-progs` to list subvolumes, create snapshots
//! named after their creation time, delete them behind a confirmation policy,
//! and list the files that changed between two snapshots.

pub mod config;
pub mod confirm;
pub mod error;
pub mod manager;
pub mod naming;
pub mod parse;
pub mod tool;
pub mod types;

// Re-export commonly used types
pub use config::{Config, LoggingLevel};
pub use confirm::{AssumeYes, Confirm, TerminalPrompt};
pub use error::{Result, SnapshotError};
pub use manager::SnapshotManager;
pub use naming::{DEFAULT_TIMESTAMP_FORMAT, TimestampFormat};
pub use parse::ChangedExtent;
pub use tool::{BtrfsTool, SystemTool, ToolOutput};
pub use types::{DeleteOutcome, TimestampedSnapshot, sort_chronologically};
