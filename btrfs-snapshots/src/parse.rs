// SPDX-License-Identifier: GPL-3.0-only

//! Parsers for btrfs-progs human-readable output.
//!
//! These formats are not a stable interface; every assumption about them is
//! kept in this module.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const FS_TREE_PREFIX: &str = "<FS_TREE>/";
const TRANSID_MARKER: &str = "transid marker was";
const SNAPSHOT_PREFIXES: [&str; 2] = ["Create a snapshot of ", "Create a readonly snapshot of "];
const DELETE_PREFIX: &str = "Delete subvolume";

/// One record of `btrfs subvolume find-new` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedExtent {
    pub inode: Option<u64>,
    pub file_offset: Option<u64>,
    pub len: Option<u64>,
    pub generation: Option<u64>,
    pub flags: String,
    pub path: String,
}

/// Extract subvolume paths from `btrfs subvolume list` output.
///
/// Paths are reported relative to the filesystem top level and returned with a
/// leading `/`.
pub fn subvolume_paths(output: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for line in output.lines() {
        let Some(relative) = path_field(line) else {
            if !line.trim().is_empty() {
                tracing::debug!("skipping subvolume list line without path: {line}");
            }
            continue;
        };

        let relative = relative.strip_prefix(FS_TREE_PREFIX).unwrap_or(relative);
        let relative = relative.trim_start_matches('/');
        if relative.is_empty() {
            continue;
        }

        paths.push(PathBuf::from(format!("/{relative}")));
    }

    paths
}

// Everything after the first `path` token, untrimmed: names may contain or
// end in spaces. `str::lines` has already dropped any `\r\n`.
fn path_field(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("path ") {
        return Some(rest);
    }

    line.find(" path ").map(|idx| &line[idx + " path ".len()..])
}

/// Generation id from the `transid marker was <N>` line of `find-new` output.
///
/// Falls back to the first integer in the output when the marker wording is
/// absent.
pub fn generation_marker(output: &str) -> Option<u64> {
    output
        .find(TRANSID_MARKER)
        .and_then(|idx| parse_first_u64(&output[idx + TRANSID_MARKER.len()..]))
        .or_else(|| parse_first_u64(output))
}

fn parse_first_u64(input: &str) -> Option<u64> {
    let digits: String = input
        .chars()
        .skip_while(|character| !character.is_ascii_digit())
        .take_while(|character| character.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Parse `find-new` change records, in reported order.
///
/// Lines without a `flags` field (the trailing transid marker, blanks) are
/// ignored.
pub fn changed_extents(output: &str) -> Vec<ChangedExtent> {
    output.lines().filter_map(parse_extent_line).collect()
}

/// Changed file paths from `find-new` output, one per reported extent.
pub fn changed_paths(output: &str) -> Vec<String> {
    changed_extents(output)
        .into_iter()
        .map(|extent| extent.path)
        .collect()
}

fn parse_extent_line(line: &str) -> Option<ChangedExtent> {
    let (head, rest) = if let Some(rest) = line.strip_prefix("flags ") {
        ("", rest)
    } else {
        let idx = line.find(" flags ")?;
        (&line[..idx], &line[idx + " flags ".len()..])
    };

    let (flags, path) = rest.split_once(' ')?;
    if path.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = head.split_whitespace().collect();
    let value_after = |key: &[&str]| {
        tokens
            .windows(key.len() + 1)
            .find(|window| window[..key.len()] == *key)
            .and_then(|window| window[key.len()].parse::<u64>().ok())
    };

    Some(ChangedExtent {
        inode: value_after(&["inode"]),
        file_offset: value_after(&["file", "offset"]),
        len: value_after(&["len"]),
        generation: value_after(&["gen"]),
        flags: flags.to_string(),
        path: path.to_string(),
    })
}

/// Check `btrfs subvolume snapshot` stdout and return where the snapshot landed.
///
/// btrfs places the snapshot inside `destination` (named after the source)
/// when `destination` is an existing directory; both shapes are accepted.
pub fn snapshot_confirmation(output: &str, source: &Path, destination: &Path) -> Option<PathBuf> {
    output.lines().find_map(|line| {
        let rest = SNAPSHOT_PREFIXES
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix))?;
        let (reported_source, reported_dest) = rest
            .strip_prefix('\'')?
            .trim_end()
            .strip_suffix('\'')?
            .split_once("' in '")?;

        if !paths_match(reported_source, source) {
            return None;
        }

        if paths_match(reported_dest, destination) {
            return Some(destination.to_path_buf());
        }

        let nested = destination.join(source.file_name()?);
        paths_match(reported_dest, &nested).then_some(nested)
    })
}

/// Check `btrfs subvolume delete` stdout against the deleted path.
pub fn is_delete_confirmation(output: &str, path: &Path) -> bool {
    output.lines().any(|line| {
        line.starts_with(DELETE_PREFIX)
            && line
                .trim_end()
                .rsplit_once(": '")
                .and_then(|(_, quoted)| quoted.strip_suffix('\''))
                .is_some_and(|reported| paths_match(reported, path))
    })
}

// btrfs echoes arguments back after its own normalisation, so compare by
// component; a relative expectation may match the tail of an absolute report.
fn paths_match(reported: &str, expected: &Path) -> bool {
    let reported = Path::new(reported);
    reported == expected || (expected.is_relative() && reported.ends_with(expected))
}
