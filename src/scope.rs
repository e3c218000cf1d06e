//! File selection.
//!
//! Either resolves an explicit list of files against the working directory,
//! or walks the project root and keeps files whose root-relative path matches
//! one of the configured glob patterns. Directories named in the skip list are
//! pruned from the walk.
//!
//! Patterns match from the right, one path component at a time: `*.md`
//! matches `a.md` and `notes/2024/a.md`, `**/*.md` needs at least one parent
//! directory, and `*` never crosses `/`. A pattern starting with `/` must match
//! the whole relative path.
//!
//! Symlinks to files are selected like regular files. Directory symlinks are
//! not followed, and directories that cannot be read are skipped with a
//! warning.

use crate::error::{ParkiveError, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Which files a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub scan_glob: Vec<String>,
    pub skip_dirs: Vec<String>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled scan pattern.
#[derive(Debug)]
struct ScanPattern {
    anchored: bool,
    components: Vec<Pattern>,
}

impl ScanPattern {
    fn parse(raw: &str) -> Result<Self> {
        let cleaned = raw.trim().trim_matches(['\'', '"', '`']);
        let anchored = cleaned.starts_with('/');
        let components = cleaned
            .split('/')
            .filter(|part| !part.is_empty())
            .map(|part| {
                Pattern::new(part).map_err(|source| ParkiveError::InvalidGlob {
                    pattern: raw.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            anchored,
            components,
        })
    }

    fn matches(&self, parts: &[&str]) -> bool {
        if self.components.is_empty() || parts.len() < self.components.len() {
            return false;
        }
        if self.anchored && parts.len() != self.components.len() {
            return false;
        }
        let tail = &parts[parts.len() - self.components.len()..];
        self.components
            .iter()
            .zip(tail)
            .all(|(pattern, part)| pattern.matches_with(part, MATCH_OPTIONS))
    }
}

/// Returns the files to process: `specified` when given, otherwise the
/// managed files under `root`.
pub fn files_to_process(
    root: &Path,
    scope: &Scope,
    specified: Option<&[String]>,
) -> Result<Vec<PathBuf>> {
    match specified {
        Some(files) => {
            let cwd = std::env::current_dir().map_err(|e| ParkiveError::io(".", e))?;
            Ok(specified_files(&cwd, files))
        }
        None => managed_files(root, scope),
    }
}

/// Resolves `files` against `cwd`, dropping entries that are not existing files.
pub fn specified_files(cwd: &Path, files: &[String]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|file| cwd.join(file))
        .filter(|path| path.is_file())
        .map(|path| std::fs::canonicalize(&path).unwrap_or(path))
        .collect()
}

/// Walks `root` and collects files matching `scope`, sorted by path.
pub fn managed_files(root: &Path, scope: &Scope) -> Result<Vec<PathBuf>> {
    let patterns = scope
        .scan_glob
        .iter()
        .map(|raw| ScanPattern::parse(raw))
        .collect::<Result<Vec<_>>>()?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry, &scope.skip_dirs));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).display().to_string();
                warn!(path = %path, error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !is_file_like(&entry) {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let parts = components(relative);
        if patterns.iter().any(|pattern| pattern.matches(&parts)) {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

fn is_file_like(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

fn is_skipped(entry: &walkdir::DirEntry, skip_dirs: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| skip_dirs.iter().any(|skip| skip == name))
}

fn components(relative: &Path) -> Vec<&str> {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect()
}
