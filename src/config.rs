//! Project root discovery and user configuration.
//!
//! A project is any directory containing a `.parkive` directory. Optional
//! settings live in `.parkive/config.toml`:
//!
//! ```toml
//! [scope]
//! scan_glob = ["*.md", "**/*.md"]
//! skip_dirs = [".git", ".parkive"]
//!
//! [publish]
//! remote = "origin"
//! branch = "main"
//! ```

use crate::error::{ParkiveError, Result};
use crate::scope::Scope;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the marker directory holding project metadata.
pub const PROJECT_DIR: &str = ".parkive";

pub const DEFAULT_SCAN_GLOB: &[&str] = &["*.md", "**/*.md"];
pub const DEFAULT_SKIP_DIRS: &[&str] = &[".git", ".parkive"];
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scope: ScopeSection,
    #[serde(default)]
    pub publish: PublishSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScopeSection {
    pub scan_glob: Vec<String>,
    pub skip_dirs: Vec<String>,
}

impl Default for ScopeSection {
    fn default() -> Self {
        Self {
            scan_glob: DEFAULT_SCAN_GLOB.iter().map(ToString::to_string).collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Where `git sync` and `git snapshot` push to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PublishSection {
    pub remote: String,
    pub branch: String,
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }
}

impl Config {
    /// Loads `.parkive/config.toml` under `root`, falling back to defaults
    /// when the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = config_path(root);
        if !path.is_file() {
            warn!(path = %path.display(), "no user config found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ParkiveError::io(&path, e))?;
        let config: Config =
            toml::from_str(&raw).map_err(|source| ParkiveError::ConfigParse { path, source })?;
        debug!(?config, "loaded user config");
        Ok(config)
    }

    /// File scope, with `glob_override` replacing the configured patterns.
    pub fn scope(&self, glob_override: Option<Vec<String>>) -> Scope {
        Scope {
            scan_glob: glob_override.unwrap_or_else(|| self.scope.scan_glob.clone()),
            skip_dirs: self.scope.skip_dirs.clone(),
        }
    }
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(PROJECT_DIR).join("config.toml")
}

/// Finds the nearest ancestor of `start` (inclusive) containing `.parkive/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| candidate.join(PROJECT_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Like [`find_project_root`], starting from the current directory.
pub fn locate_project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| ParkiveError::io(".", e))?;
    let cwd = std::fs::canonicalize(&cwd).unwrap_or(cwd);
    find_project_root(&cwd).ok_or(ParkiveError::ProjectRootNotFound { start: cwd })
}
