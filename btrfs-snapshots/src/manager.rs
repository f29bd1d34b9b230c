// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::config::Config;
use crate::confirm::Confirm;
use crate::error::{Result, SnapshotError};
use crate::naming::TimestampFormat;
use crate::parse::{self, ChangedExtent};
use crate::tool::{self, BtrfsTool, SystemTool};
use crate::types::{DeleteOutcome, TimestampedSnapshot};

/// Manager for timestamp-named BTRFS snapshots
pub struct SnapshotManager<T: BtrfsTool = SystemTool> {
    tool: T,
    format: TimestampFormat,
    readonly: bool,
}

impl SnapshotManager<SystemTool> {
    /// Build a manager from configuration, resolving the btrfs executable.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.tool()?)
            .with_timestamp_format(config.timestamp_format.clone())
            .with_readonly(config.readonly_snapshots))
    }
}

impl<T: BtrfsTool> SnapshotManager<T> {
    pub fn new(tool: T) -> Self {
        Self {
            tool,
            format: TimestampFormat::default(),
            readonly: false,
        }
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.format = format;
        self
    }

    /// Create snapshots read-only (`btrfs subvolume snapshot -r`).
    pub fn with_readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    pub fn timestamp_format(&self) -> &TimestampFormat {
        &self.format
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    fn invoke(&self, args: Vec<OsString>) -> Result<String> {
        self.tool.run(&args)?.into_stdout(&args)
    }

    /// List subvolumes known to the filesystem containing `root`.
    ///
    /// With `filter_prefix`, only strict descendants of that path are kept.
    pub fn list_subvolumes(&self, root: &Path, filter_prefix: Option<&Path>) -> Result<Vec<PathBuf>> {
        let stdout = self.invoke(tool::list_args(root))?;
        let mut subvolumes = parse::subvolume_paths(&stdout);

        if subvolumes.is_empty() && !stdout.trim().is_empty() {
            tracing::warn!("No subvolumes found - output may not have been parsed correctly");
        }

        if let Some(prefix) = filter_prefix {
            subvolumes.retain(|path| path.starts_with(prefix) && path != prefix);
        }

        Ok(subvolumes)
    }

    /// List subvolumes whose basename is a snapshot timestamp, in listing order.
    ///
    /// Other subvolumes are skipped with a warning.
    pub fn list_timestamped_snapshots(
        &self,
        root: &Path,
        filter_prefix: Option<&Path>,
    ) -> Result<Vec<TimestampedSnapshot>> {
        let subvolumes = self.list_subvolumes(root, filter_prefix)?;
        let mut snapshots = Vec::with_capacity(subvolumes.len());

        for path in subvolumes {
            let timestamp = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| self.format.parse(name));

            match timestamp {
                Some(timestamp) => snapshots.push(TimestampedSnapshot { path, timestamp }),
                None => tracing::warn!("skipping invalid formatted snapshot '{}'", path.display()),
            }
        }

        Ok(snapshots)
    }

    /// Newest snapshot by parsed timestamp.
    pub fn latest_snapshot(
        &self,
        root: &Path,
        filter_prefix: Option<&Path>,
    ) -> Result<Option<TimestampedSnapshot>> {
        Ok(self
            .list_timestamped_snapshots(root, filter_prefix)?
            .into_iter()
            .max_by_key(|snapshot| snapshot.timestamp))
    }

    /// Snapshot `source` at `destination` and return the created subvolume path.
    pub fn create_snapshot(&self, source: &Path, destination: &Path) -> Result<PathBuf> {
        tracing::info!(
            "Creating snapshot from {} to {}, readonly={}",
            source.display(),
            destination.display(),
            self.readonly
        );

        let stdout = self.invoke(tool::snapshot_args(source, destination, self.readonly))?;
        parse::snapshot_confirmation(&stdout, source, destination)
            .ok_or(SnapshotError::CreateSnapshot(stdout))
    }

    /// Snapshot `source` into `destination_dir`, named after the current local time.
    pub fn create_timestamped_snapshot(&self, source: &Path, destination_dir: &Path) -> Result<PathBuf> {
        self.create_timestamped_snapshot_at(source, destination_dir, Local::now().naive_local())
    }

    /// Snapshot `source` into `destination_dir`, named after `at`.
    ///
    /// Two calls for the same second produce the same name; btrfs decides
    /// what happens to the second one.
    pub fn create_timestamped_snapshot_at(
        &self,
        source: &Path,
        destination_dir: &Path,
        at: NaiveDateTime,
    ) -> Result<PathBuf> {
        let destination = destination_dir.join(self.format.format(&at));
        self.create_snapshot(source, &destination)
    }

    /// Delete a snapshot after `confirm` approves it.
    pub fn delete_snapshot<C: Confirm + ?Sized>(&self, path: &Path, confirm: &C) -> Result<DeleteOutcome> {
        if !confirm.confirm(&format!("delete subvolume {}?", path.display()))? {
            tracing::info!("Deletion of {} declined", path.display());
            return Ok(DeleteOutcome::Declined);
        }

        tracing::info!("Deleting snapshot {}", path.display());

        let stdout = self.invoke(tool::delete_args(path))?;
        if !parse::is_delete_confirmation(&stdout, path) {
            return Err(SnapshotError::DeleteSnapshot(stdout));
        }

        Ok(DeleteOutcome::Deleted)
    }

    /// Current generation of `snapshot`.
    ///
    /// Asks `find-new` for changes past an unreachable generation; nothing is
    /// listed but the transid marker reports where the subvolume is.
    pub fn generation(&self, snapshot: &Path) -> Result<u64> {
        let stdout = self.invoke(tool::find_new_args(snapshot, tool::PROBE_GENERATION))?;
        parse::generation_marker(&stdout).ok_or_else(|| {
            SnapshotError::Parse(format!(
                "no generation id in find-new output for {}: {}",
                snapshot.display(),
                stdout.trim()
            ))
        })
    }

    /// Files changed in `new_snapshot` since `old_snapshot`, as `find-new` reports them.
    pub fn diff(&self, old_snapshot: &Path, new_snapshot: &Path) -> Result<Vec<String>> {
        let stdout = self.find_new_since(old_snapshot, new_snapshot)?;
        Ok(parse::changed_paths(&stdout))
    }

    /// Like [`diff`](Self::diff) but keeps the full `find-new` records.
    pub fn diff_extents(&self, old_snapshot: &Path, new_snapshot: &Path) -> Result<Vec<ChangedExtent>> {
        let stdout = self.find_new_since(old_snapshot, new_snapshot)?;
        Ok(parse::changed_extents(&stdout))
    }

    // find-new has no two-snapshot form: the old snapshot's generation is the baseline.
    fn find_new_since(&self, old_snapshot: &Path, new_snapshot: &Path) -> Result<String> {
        let baseline = self.generation(old_snapshot)?;
        tracing::debug!(
            "diffing {} against generation {} of {}",
            new_snapshot.display(),
            baseline,
            old_snapshot.display()
        );

        self.invoke(tool::find_new_args(new_snapshot, baseline))
    }
}
