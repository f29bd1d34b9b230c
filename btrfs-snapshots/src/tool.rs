// SPDX-License-Identifier: GPL-3.0-only

//! The seam between snapshot logic and the `btrfs` executable.
//!
//! Everything that spawns a process lives here. [`SnapshotManager`] only sees
//! the [`BtrfsTool`] trait, so tests (or a future ioctl-based backend) can
//! stand in for the real binary.
//!
//! [`SnapshotManager`]: crate::SnapshotManager

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, SnapshotError};

/// Name of the btrfs-progs executable.
pub const BTRFS: &str = "btrfs";

/// Generation passed to `find-new` when only the transid marker is wanted.
pub const PROBE_GENERATION: u64 = 9_999_999;

/// Captured result of a single tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns stdout, or a [`SnapshotError::ToolInvocation`] carrying stderr
    /// if the tool exited non-zero.
    pub fn into_stdout(self, args: &[OsString]) -> Result<String> {
        if !self.success {
            return Err(SnapshotError::ToolInvocation {
                command: render(BTRFS, args),
                stderr: self.stderr,
            });
        }

        Ok(self.stdout)
    }
}

/// Runs btrfs-progs subcommands.
pub trait BtrfsTool {
    /// Run `btrfs <args...>` to completion, capturing both output streams.
    ///
    /// A non-zero exit is reported through [`ToolOutput::success`], not as an
    /// error. `Err` is reserved for failing to run the tool at all.
    fn run(&self, args: &[OsString]) -> Result<ToolOutput>;
}

impl<T: BtrfsTool + ?Sized> BtrfsTool for &T {
    fn run(&self, args: &[OsString]) -> Result<ToolOutput> {
        (**self).run(args)
    }
}

/// [`BtrfsTool`] backed by a child process.
#[derive(Debug, Clone)]
pub struct SystemTool {
    program: PathBuf,
}

impl SystemTool {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve `btrfs` on `PATH`.
    pub fn locate() -> Result<Self> {
        let program = which::which(BTRFS)
            .map_err(|e| SnapshotError::ToolUnavailable(format!("{BTRFS} not found: {e}")))?;
        Ok(Self::new(program))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for SystemTool {
    fn default() -> Self {
        Self::new(BTRFS)
    }
}

impl BtrfsTool for SystemTool {
    fn run(&self, args: &[OsString]) -> Result<ToolOutput> {
        tracing::debug!("running {}", render(&self.program.to_string_lossy(), args));

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| {
                SnapshotError::ToolUnavailable(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Format a command line for logs and error messages.
pub fn render(command: &str, args: &[OsString]) -> String {
    if args.is_empty() {
        return command.to_string();
    }

    let args: Vec<_> = args.iter().map(|arg| arg.to_string_lossy()).collect();
    format!("{} {}", command, args.join(" "))
}

fn subvolume_args<'a>(action: &str, rest: impl IntoIterator<Item = &'a OsStr>) -> Vec<OsString> {
    ["subvolume", action]
        .into_iter()
        .map(OsString::from)
        .chain(rest.into_iter().map(OsStr::to_os_string))
        .collect()
}

/// `subvolume list <root>`
pub fn list_args(root: &Path) -> Vec<OsString> {
    subvolume_args("list", [root.as_os_str()])
}

/// `subvolume snapshot [-r] <source> <destination>`
pub fn snapshot_args(source: &Path, destination: &Path, readonly: bool) -> Vec<OsString> {
    let mut rest = Vec::with_capacity(3);
    if readonly {
        rest.push(OsStr::new("-r"));
    }
    rest.push(source.as_os_str());
    rest.push(destination.as_os_str());

    subvolume_args("snapshot", rest)
}

/// `subvolume delete <path>`
pub fn delete_args(path: &Path) -> Vec<OsString> {
    subvolume_args("delete", [path.as_os_str()])
}

/// `subvolume find-new <path> <generation>`
pub fn find_new_args(path: &Path, generation: u64) -> Vec<OsString> {
    let generation = OsString::from(generation.to_string());
    subvolume_args("find-new", [path.as_os_str(), generation.as_os_str()])
}
