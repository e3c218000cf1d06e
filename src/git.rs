//! Version-control command execution.
//!
//! [`VersionControl`] is the only seam through which the publish protocol
//! talks to the outside world. [`Git`] runs the real `git` binary inside the
//! project root; tests substitute a scripted implementation.

use crate::error::{ParkiveError, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::trace;

/// Captured result of one version-control invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(exit_code),
        }
    }

    /// Converts a non-zero exit into [`ParkiveError::CommandFailed`].
    pub fn check(self, command: &str) -> Result<Self> {
        if self.succeeded {
            return Ok(self);
        }
        let stderr = if self.stderr.trim().is_empty() {
            self.stdout
        } else {
            self.stderr
        };
        Err(ParkiveError::CommandFailed {
            command: command.to_string(),
            exit_code: self.exit_code,
            stderr,
        })
    }
}

/// Runs version-control commands against a fixed working directory.
pub trait VersionControl {
    /// Executes the tool with `args`. A non-zero exit is reported through
    /// [`CommandOutcome::succeeded`]; only failing to start the tool is an `Err`.
    fn run(&self, args: &[&str]) -> Result<CommandOutcome>;

    /// Human-readable form of a command, e.g. `git add .`.
    fn display(&self, args: &[&str]) -> String;
}

/// The `git` command-line tool.
#[derive(Debug, Clone)]
pub struct Git {
    root: PathBuf,
}

impl Git {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl VersionControl for Git {
    fn run(&self, args: &[&str]) -> Result<CommandOutcome> {
        trace!(command = %self.display(args), root = %self.root.display(), "running");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|source| ParkiveError::Spawn {
                program: "git",
                source,
            })?;

        Ok(CommandOutcome {
            succeeded: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }

    fn display(&self, args: &[&str]) -> String {
        let mut text = String::from("git");
        for arg in args {
            text.push(' ');
            text.push_str(arg);
        }
        text
    }
}
