// SPDX-License-Identifier: GPL-3.0-only

use std::cell::RefCell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use btrfs_snapshots::{
    AssumeYes, BtrfsTool, DeleteOutcome, Result, SnapshotError, SnapshotManager, TimestampFormat,
    ToolOutput, sort_chronologically,
};
use chrono::NaiveDateTime;

/// In-memory stand-in for btrfs-progs that keeps a subvolume table and
/// answers with the same text the real tool prints.
struct FakeBtrfs {
    subvolumes: RefCell<Vec<(String, u64)>>,
    generation: RefCell<u64>,
}

impl FakeBtrfs {
    fn new(subvolumes: &[&str]) -> Self {
        Self {
            subvolumes: RefCell::new(
                subvolumes
                    .iter()
                    .enumerate()
                    .map(|(idx, path)| (path.to_string(), 10 + idx as u64))
                    .collect(),
            ),
            generation: RefCell::new(100),
        }
    }

    fn relative(path: &OsString) -> String {
        path.to_string_lossy().trim_start_matches('/').to_string()
    }
}

impl BtrfsTool for FakeBtrfs {
    fn run(&self, args: &[OsString]) -> Result<ToolOutput> {
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let output = match args.as_slice() {
            ["subvolume", "list", _root] => {
                let listing = self
                    .subvolumes
                    .borrow()
                    .iter()
                    .enumerate()
                    .map(|(idx, (path, generation))| {
                        format!("ID {} gen {} top level 5 path {}\n", 256 + idx, generation, path)
                    })
                    .collect::<String>();
                ToolOutput::ok(listing)
            }
            ["subvolume", "snapshot", source, destination] => {
                let relative = Self::relative(&OsString::from(destination));
                if self.subvolumes.borrow().iter().any(|(path, _)| *path == relative) {
                    ToolOutput::failed(format!(
                        "ERROR: target path already exists: {destination}\n"
                    ))
                } else {
                    let mut generation = self.generation.borrow_mut();
                    *generation += 1;
                    self.subvolumes.borrow_mut().push((relative, *generation));
                    ToolOutput::ok(format!("Create a snapshot of '{source}' in '{destination}'\n"))
                }
            }
            ["subvolume", "delete", path] => {
                let relative = Self::relative(&OsString::from(path));
                let mut subvolumes = self.subvolumes.borrow_mut();
                let before = subvolumes.len();
                subvolumes.retain(|(existing, _)| *existing != relative);
                if subvolumes.len() == before {
                    ToolOutput::failed(format!(
                        "ERROR: cannot access subvolume {path}: No such file or directory\n"
                    ))
                } else {
                    ToolOutput::ok(format!("Delete subvolume (no-commit): '{path}'\n"))
                }
            }
            ["subvolume", "find-new", path, since] => {
                let relative = Self::relative(&OsString::from(path));
                let since: u64 = since.parse().unwrap();
                let subvolumes = self.subvolumes.borrow();
                let Some((_, generation)) = subvolumes.iter().find(|(p, _)| *p == relative) else {
                    return Ok(ToolOutput::failed("ERROR: can't access: No such file or directory\n"));
                };
                let mut report = String::new();
                if since < *generation {
                    report.push_str(&format!(
                        "inode 257 file offset 0 len 4096 disk start 0 offset 0 gen {generation} flags NONE etc/fstab\n"
                    ));
                }
                report.push_str(&format!("transid marker was {generation}\n"));
                ToolOutput::ok(report)
            }
            other => panic!("unexpected btrfs invocation: {other:?}"),
        };

        Ok(output)
    }
}

fn at(timestamp: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[test]
fn snapshot_lifecycle_round_trip() {
    let manager = SnapshotManager::new(FakeBtrfs::new(&["data", "snapshots", "snapshots/scratch"]));
    let root = Path::new("/");
    let snapshots_dir = Path::new("/snapshots");

    let first = manager
        .create_timestamped_snapshot_at(Path::new("/data"), snapshots_dir, at("2024-03-01 09:00:00"))
        .unwrap();
    let second = manager
        .create_timestamped_snapshot_at(Path::new("/data"), snapshots_dir, at("2024-02-01 09:00:00"))
        .unwrap();
    assert_eq!(first, PathBuf::from("/snapshots/2024_03_01_09_00_00"));

    let mut listed = manager
        .list_timestamped_snapshots(root, Some(snapshots_dir))
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].path, first);

    sort_chronologically(&mut listed);
    assert_eq!(listed[0].path, second);

    let latest = manager.latest_snapshot(root, Some(snapshots_dir)).unwrap().unwrap();
    assert_eq!(latest.path, first);

    let changed = manager.diff(&first, &second).unwrap();
    assert_eq!(changed, vec!["etc/fstab"]);
    assert!(manager.diff(&second, &first).unwrap().is_empty());

    assert_eq!(manager.delete_snapshot(&first, &AssumeYes).unwrap(), DeleteOutcome::Deleted);
    let remaining = manager.list_subvolumes(root, Some(snapshots_dir)).unwrap();
    assert_eq!(
        remaining,
        vec![
            PathBuf::from("/snapshots/scratch"),
            PathBuf::from("/snapshots/2024_02_01_09_00_00"),
        ]
    );
}

#[test]
fn same_second_collision_is_left_to_the_tool() {
    let manager = SnapshotManager::new(FakeBtrfs::new(&["data"]));
    let when = at("2024-03-01 09:00:00");

    manager
        .create_timestamped_snapshot_at(Path::new("/data"), Path::new("/snapshots"), when)
        .unwrap();
    let err = manager
        .create_timestamped_snapshot_at(Path::new("/data"), Path::new("/snapshots"), when)
        .unwrap_err();

    match err {
        SnapshotError::ToolInvocation { stderr, .. } => {
            assert!(stderr.contains("already exists"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn custom_naming_convention_only_sees_its_own_snapshots() {
    let manager = SnapshotManager::new(FakeBtrfs::new(&[
        "snapshots/2024_03_01_09_00_00",
        "snapshots/2024-03-02T09:00:00",
    ]))
    .with_timestamp_format(TimestampFormat::new("%Y-%m-%dT%H:%M:%S").unwrap());

    let listed = manager
        .list_timestamped_snapshots(Path::new("/"), Some(Path::new("/snapshots")))
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].path, PathBuf::from("/snapshots/2024-03-02T09:00:00"));
}

#[test]
fn deleting_a_missing_snapshot_reports_stderr() {
    let manager = SnapshotManager::new(FakeBtrfs::new(&["data"]));

    let err = manager
        .delete_snapshot(Path::new("/snapshots/2024_03_01_09_00_00"), &AssumeYes)
        .unwrap_err();

    assert!(matches!(
        err,
        SnapshotError::ToolInvocation { ref stderr, .. } if stderr.contains("No such file")
    ));
}
