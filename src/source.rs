//! Content sources and mod-over-base file resolution
//!
//! A content source is a mod directory or the base game directory. A
//! session runs against a [`SourcePair`]: the primary source (usually the
//! active mod) plus an optional base source whose files apply wherever
//! the primary doesn't override them.

use std::path::{Path, PathBuf};

/// Standard relative path of the province raster.
pub const PROVINCES_RASTER: &str = "map/provinces.bmp";
/// Standard relative path of the province legend.
pub const PROVINCE_LEGEND: &str = "map/definition.csv";
/// Standard relative path of the buildings file.
pub const BUILDINGS_FILE: &str = "map/buildings.txt";
/// Standard relative directory of state history files.
pub const STATES_DIR: &str = "history/states";

/// One installed content source: a mod or the base game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSource {
    pub name: String,
    pub version: String,
    pub root: PathBuf,
}

impl ContentSource {
    pub fn new(name: impl Into<String>, version: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), version: version.into(), root: root.into() }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Directory name for this source's cache: sanitized name plus
    /// version, so caches from different sources and versions never
    /// collide.
    pub fn cache_dir_name(&self) -> String {
        let mut sanitized: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if sanitized.is_empty() {
            sanitized.push('_');
        }
        format!("{}_{}", sanitized, self.version)
    }
}

/// The active source plus an optional base source it overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePair {
    pub primary: ContentSource,
    pub base: Option<ContentSource>,
}

impl SourcePair {
    pub fn standalone(primary: ContentSource) -> Self {
        Self { primary, base: None }
    }

    pub fn with_base(primary: ContentSource, base: ContentSource) -> Self {
        Self { primary, base: Some(base) }
    }

    /// Resolve a relative path against the pair: the primary's file wins
    /// if it exists, else the base's, else `None`.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let candidate = self.primary.path(relative);
        if candidate.exists() {
            return Some(candidate);
        }
        let fallback = self.base.as_ref()?.path(relative);
        fallback.exists().then_some(fallback)
    }

    /// The primary's states directory (it may not exist; the scanner
    /// treats that as empty).
    pub fn primary_states_dir(&self) -> PathBuf {
        self.primary.path(STATES_DIR)
    }

    /// The base source's states directory, when a base is configured.
    pub fn base_states_dir(&self) -> Option<PathBuf> {
        self.base.as_ref().map(|b| b.path(STATES_DIR))
    }
}

/// Convenience for tests and the CLI: a source named after its directory.
pub fn source_from_root(root: &Path) -> ContentSource {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    ContentSource::new(name, "0", root)
}
