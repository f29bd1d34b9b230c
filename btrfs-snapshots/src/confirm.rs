// SPDX-License-Identifier: GPL-3.0-only

//! Confirmation policies for destructive operations.
//!
//! Subvolume deletion cannot be undone, so [`SnapshotManager::delete_snapshot`]
//! always asks a [`Confirm`] implementation first. The policy is supplied by
//! the caller: an interactive prompt for the CLI, a fixed answer for scripts,
//! or a closure in tests.
//!
//! [`SnapshotManager::delete_snapshot`]: crate::SnapshotManager::delete_snapshot

use std::io::{self, BufRead, Write};

use crate::error::Result;

/// Decides whether a destructive operation may proceed.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(self(prompt))
    }
}

/// Confirms everything without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        tracing::debug!("auto-confirmed: {prompt}");
        Ok(true)
    }
}

/// Asks on stderr and reads one answer line from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{prompt} ")?;
        stderr.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}

/// `yes` or `y`, case-insensitive. Anything else, including an empty line, is a no.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("yes") || answer.eq_ignore_ascii_case("y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_yes_and_y() {
        for answer in ["yes", "y", "YES", "Y", "Yes\n", "  y  "] {
            assert!(is_affirmative(answer), "{answer:?} should confirm");
        }
        for answer in ["no", "n", "", "\n", "yess", "sure", "ja"] {
            assert!(!is_affirmative(answer), "{answer:?} should decline");
        }
    }

    #[test]
    fn closures_act_as_policies() {
        let decline = |_: &str| false;
        assert!(!decline.confirm("delete?").unwrap());
        assert!(AssumeYes.confirm("delete?").unwrap());
    }
}
