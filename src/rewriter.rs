//! Source migration for text and files.
//!
//! Text-level rewriting moves every image reference under one base URL to
//! another in two passes (markdown, then HTML over the markdown result). Bytes
//! outside replaced URLs are copied through untouched.
//!
//! File-level helpers apply the same rewrite to a batch of paths, writing only
//! files whose content actually changed.

use crate::error::{ParkiveError, Result};
use crate::prefix;
use crate::scanner::{self, Syntax};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of rewriting one text blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteResult {
    pub new_text: String,
    pub replaced_count: usize,
}

/// Rewrites image URLs under `source_prefix` to live under `target_prefix`.
pub fn replace_references(content: &str, source_prefix: &str, target_prefix: &str) -> RewriteResult {
    let mut replaced_count = 0;
    let mut text = content.to_string();
    for syntax in Syntax::ALL {
        text = rewrite_pass(&text, syntax, source_prefix, target_prefix, &mut replaced_count);
    }
    RewriteResult {
        new_text: text,
        replaced_count,
    }
}

fn rewrite_pass(
    text: &str,
    syntax: Syntax,
    source_prefix: &str,
    target_prefix: &str,
    replaced_count: &mut usize,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied_to = 0;

    for reference in scanner::scan(text, syntax) {
        let converted = prefix::rewrite(reference.url, source_prefix, target_prefix);
        if converted == reference.url {
            continue;
        }
        debug!(?syntax, from = reference.url, to = %converted, "replacing url");
        out.push_str(&text[copied_to..reference.span.start]);
        out.push_str(&reference.render(&converted));
        copied_to = reference.span.end;
        *replaced_count += 1;
    }

    out.push_str(&text[copied_to..]);
    out
}

/// Counts references (both syntaxes) whose URL lies under `base_url`.
pub fn count_matches(content: &str, base_url: &str) -> usize {
    scanner::scan_all(content)
        .filter(|reference| prefix::matches(reference.url, base_url))
        .count()
}

/// Aggregate result of a file migration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStats {
    pub files_scanned: usize,
    pub changed_files: usize,
    pub replacements: usize,
}

/// Per-file and total usage of one source.
#[derive(Debug, Default, Clone)]
pub struct UsageReport {
    pub files: Vec<FileUsage>,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct FileUsage {
    pub path: PathBuf,
    pub count: usize,
}

/// Reads a file as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| ParkiveError::io(path, e))?;
    String::from_utf8(bytes).map_err(|_| ParkiveError::Encoding {
        path: path.to_path_buf(),
    })
}

/// Rewrites every file in `paths`, writing back only files with replacements.
///
/// The first read or write failure stops the batch. Files already written
/// stay written; the error reports how far the batch got.
pub fn rewrite_files<I>(paths: I, source_prefix: &str, target_prefix: &str) -> Result<MigrationStats>
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    let mut stats = MigrationStats::default();

    for path in paths {
        let path = path.as_ref();
        if let Err(err) = rewrite_file(path, source_prefix, target_prefix, &mut stats) {
            return Err(ParkiveError::BatchAborted {
                changed_files: stats.changed_files,
                replacements: stats.replacements,
                source: Box::new(err),
            });
        }
    }

    Ok(stats)
}

fn rewrite_file(
    path: &Path,
    source_prefix: &str,
    target_prefix: &str,
    stats: &mut MigrationStats,
) -> Result<()> {
    let original = read_text(path)?;
    stats.files_scanned += 1;

    let result = replace_references(&original, source_prefix, target_prefix);
    if result.replaced_count == 0 {
        return Ok(());
    }

    std::fs::write(path, &result.new_text).map_err(|e| ParkiveError::io(path, e))?;
    debug!(path = %path.display(), replaced = result.replaced_count, "rewrote file");
    stats.changed_files += 1;
    stats.replacements += result.replaced_count;
    Ok(())
}

/// Counts references under `base_url` across `paths`.
pub fn count_in_files<I>(paths: I, base_url: &str) -> Result<UsageReport>
where
    I: IntoIterator,
    I::Item: AsRef<Path>,
{
    let mut report = UsageReport::default();

    for path in paths {
        let path = path.as_ref();
        let count = count_matches(&read_text(path)?, base_url);
        debug!(path = %path.display(), count, base_url, "scanned file");
        report.total += count;
        report.files.push(FileUsage {
            path: path.to_path_buf(),
            count,
        });
    }

    Ok(report)
}
