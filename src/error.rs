//! Error types shared by the library.
//!
//! Every variant carries enough context (path, command, stderr) to diagnose a
//! failure without re-running it. Nothing here is retried automatically.

use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T, E = ParkiveError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ParkiveError {
    /// A base URL that is not of the form `scheme://host[:port]`.
    #[error("invalid base_url '{input}': {reason}")]
    InvalidBaseUrl { input: String, reason: &'static str },

    #[error("invalid glob pattern '{pattern}'")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("source '{name}' not found")]
    SourceNotFound { name: String },

    #[error("source '{name}' already exists")]
    SourceExists { name: String },

    #[error("cannot find .parkive directory from {} upward", .start.display())]
    ProjectRootNotFound { start: PathBuf },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", .path.display())]
    Encoding { path: PathBuf },

    #[error("failed to parse {}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize {}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("failed to run {program}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A version-control command exited non-zero.
    #[error("`{command}` failed ({}): {}", exit_label(.exit_code), .stderr.trim())]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// A file batch stopped part-way. Files counted here were already written.
    #[error("aborted after replacing {replacements} urls in {changed_files} files")]
    BatchAborted {
        changed_files: usize,
        replacements: usize,
        #[source]
        source: Box<ParkiveError>,
    },
}

impl ParkiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_message_includes_stderr() {
        let err = ParkiveError::CommandFailed {
            command: "git push origin main --force".to_string(),
            exit_code: Some(128),
            stderr: "fatal: unable to access remote\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`git push origin main --force` failed (exit code 128): fatal: unable to access remote"
        );
    }

    #[test]
    fn batch_abort_exposes_cause() {
        let err = ParkiveError::BatchAborted {
            changed_files: 2,
            replacements: 5,
            source: Box::new(ParkiveError::Encoding {
                path: PathBuf::from("notes/bad.md"),
            }),
        };
        assert_eq!(
            err.to_string(),
            "aborted after replacing 5 urls in 2 files"
        );
        let cause = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("notes/bad.md is not valid UTF-8"));
    }
}
