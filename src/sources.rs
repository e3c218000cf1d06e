//! Named image sources, persisted in `.parkive/sources.toml`:
//!
//! ```toml
//! [sources]
//! old = "http://old:80"
//! cdn = "https://cdn.example.com"
//! ```

use crate::config::PROJECT_DIR;
use crate::error::{ParkiveError, Result};
use crate::prefix::normalize_base_url;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A named base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub name: String,
    pub base_url: String,
}

/// The project's source registry, ordered by name.
#[derive(Debug)]
pub struct Sources {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SourcesFile<'a> {
    sources: &'a BTreeMap<String, String>,
}

impl Sources {
    /// Loads the registry for the project at `root`. A missing file is an
    /// empty registry; entries whose value is not a string are ignored.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(PROJECT_DIR).join("sources.toml");
        let mut entries = BTreeMap::new();

        if path.is_file() {
            let raw = std::fs::read_to_string(&path).map_err(|e| ParkiveError::io(&path, e))?;
            let table: toml::Table = toml::from_str(&raw).map_err(|source| {
                ParkiveError::ConfigParse {
                    path: path.clone(),
                    source,
                }
            })?;
            match table.get("sources") {
                Some(toml::Value::Table(sources)) => {
                    for (name, value) in sources {
                        match value.as_str() {
                            Some(url) => {
                                entries.insert(name.clone(), url.to_string());
                            }
                            None => warn!(name = %name, "ignoring non-string source entry"),
                        }
                    }
                }
                Some(_) => warn!(path = %path.display(), "'sources' should be a table"),
                None => {}
            }
        }

        debug!(count = entries.len(), "loaded sources");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sources in name order.
    pub fn iter(&self) -> impl Iterator<Item = Source> + '_ {
        self.entries.iter().map(|(name, base_url)| Source {
            name: name.clone(),
            base_url: base_url.clone(),
        })
    }

    /// Resolves a source name to its base URL.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.entries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ParkiveError::SourceNotFound {
                name: name.to_string(),
            })
    }

    /// Registers a new source and saves the registry. Returns the normalized URL.
    pub fn add(&mut self, name: &str, base_url: &str) -> Result<String> {
        if self.entries.contains_key(name) {
            return Err(ParkiveError::SourceExists {
                name: name.to_string(),
            });
        }
        let normalized = normalize_base_url(base_url)?;
        self.entries.insert(name.to_string(), normalized.clone());
        self.save()?;
        Ok(normalized)
    }

    /// Removes a source and saves the registry. Returns its base URL.
    pub fn remove(&mut self, name: &str) -> Result<String> {
        let removed = self
            .entries
            .remove(name)
            .ok_or_else(|| ParkiveError::SourceNotFound {
                name: name.to_string(),
            })?;
        self.save()?;
        Ok(removed)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ParkiveError::io(parent, e))?;
        }
        let raw = toml::to_string(&SourcesFile {
            sources: &self.entries,
        })
        .map_err(|source| ParkiveError::ConfigWrite {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, raw).map_err(|e| ParkiveError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(sources: &Sources) -> Vec<String> {
        sources.iter().map(|s| s.name).collect()
    }

    #[test]
    fn missing_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let sources = Sources::load(dir.path()).unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn loads_fixture_in_name_order() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/archive");
        let sources = Sources::load(&root).unwrap();
        assert_eq!(names(&sources), vec!["cdn", "old"]);
        assert_eq!(sources.require("old").unwrap(), "http://old:80");
    }

    #[test]
    fn add_normalizes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = Sources::load(dir.path()).unwrap();
        let url = sources.add("new", " http://new:9000/ ").unwrap();
        assert_eq!(url, "http://new:9000");

        let reloaded = Sources::load(dir.path()).unwrap();
        assert_eq!(reloaded.require("new").unwrap(), "http://new:9000");
        let raw = std::fs::read_to_string(reloaded.path()).unwrap();
        assert!(raw.contains("[sources]"), "{raw}");
    }

    #[test]
    fn add_rejects_duplicates_and_bad_urls() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = Sources::load(dir.path()).unwrap();
        sources.add("old", "http://old:80").unwrap();

        let err = sources.add("old", "http://other").unwrap_err();
        assert!(matches!(err, ParkiveError::SourceExists { .. }));

        let err = sources.add("bad", "http://host/path").unwrap_err();
        assert!(matches!(err, ParkiveError::InvalidBaseUrl { .. }));
        assert!(sources.require("bad").is_err());
    }

    #[test]
    fn remove_returns_url_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut sources = Sources::load(dir.path()).unwrap();
        sources.add("a", "http://a").unwrap();
        sources.add("b", "http://b").unwrap();

        assert_eq!(sources.remove("a").unwrap(), "http://a");
        assert_eq!(names(&Sources::load(dir.path()).unwrap()), vec!["b"]);

        let err = sources.remove("a").unwrap_err();
        assert!(matches!(err, ParkiveError::SourceNotFound { ref name } if name == "a"));
    }

    #[test]
    fn non_string_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(
            dir.path().join(PROJECT_DIR).join("sources.toml"),
            "[sources]\ngood = \"http://good\"\nbad = 42\n",
        )
        .unwrap();
        let sources = Sources::load(dir.path()).unwrap();
        assert_eq!(names(&sources), vec!["good"]);
    }

    #[test]
    fn non_table_sources_key_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(
            dir.path().join(PROJECT_DIR).join("sources.toml"),
            "sources = \"nope\"\n",
        )
        .unwrap();
        assert!(Sources::load(dir.path()).unwrap().is_empty());
    }
}
