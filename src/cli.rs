//! Command-line interface definitions.
//!
//! Defines the argument parser and subcommands using clap's derive API.
//! Commands are grouped the way they are used: managing image sources,
//! publishing through git, and small utilities.

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Manage a personal archive of notes and the image sources they embed.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Image source management.
    #[command(subcommand)]
    Source(SourceCommand),

    /// Publish the archive with a rewritten, force-pushed history.
    #[command(subcommand)]
    Git(GitCommand),

    /// Utilities over managed files.
    #[command(subcommand)]
    Tool(ToolCommand),
}

#[derive(Debug, Subcommand)]
pub enum SourceCommand {
    /// Add a source. The base URL must look like scheme://host[:port].
    Add {
        /// Name of the source to add.
        name: String,
        /// Base URL of the source, e.g. http://host:port.
        base_url: String,
    },

    /// Remove a source.
    Remove {
        /// Name of the source to remove.
        name: String,
    },

    /// List configured sources.
    List {
        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// Count images that use a source.
    Inspect {
        /// Name of the source to inspect.
        name: String,

        /// Only inspect these files instead of all managed files. Repeatable.
        #[arg(short, long = "file")]
        files: Option<Vec<String>>,

        /// Emit JSON instead of human-readable output.
        #[arg(long)]
        json: bool,
    },

    /// Move image references from one source to another.
    Change {
        /// Source name to change from.
        src: String,
        /// Source name to change to.
        tgt: String,

        #[command(flatten)]
        selection: FileSelection,

        /// Emit the migration statistics as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum GitCommand {
    /// Amend the last commit with all changes and force-push it.
    Sync {
        /// Emit the publish report as JSON instead of the step trace.
        #[arg(long)]
        json: bool,
    },

    /// Amend the last commit as a dated snapshot, add a `latest` marker
    /// commit on top and force-push.
    Snapshot {
        /// Message for the snapshot commit. Defaults to snapshot:<YYYY-MM-DD>.
        #[arg(short, long)]
        message: Option<String>,

        /// Emit the publish report as JSON instead of the step trace.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ToolCommand {
    /// Count words in managed files (CJK ideographs count one each).
    Wc {
        #[command(flatten)]
        selection: FileSelection,
    },
}

/// Overrides for which files a command touches.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct FileSelection {
    /// Only process these files instead of all managed files. Repeatable.
    #[arg(short, long = "file")]
    pub files: Option<Vec<String>>,

    /// Replace the configured scan_glob patterns. Repeatable.
    #[arg(short, long = "glob")]
    pub globs: Option<Vec<String>>,
}
