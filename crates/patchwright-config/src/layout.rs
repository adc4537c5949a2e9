//! Config root layout and loader settings.

use std::path::{Path, PathBuf};

use patchwright_core::EntityKind;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

// ---------------------------------------------------------------------------
// LoaderConfig
// ---------------------------------------------------------------------------

/// Settings for the parallel snapshot loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Number of parse workers. `None` = half the available processors.
    pub worker_count: Option<usize>,
    /// File extensions to load, without the dot. Matched case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            extensions: ["yml", "yaml", "json"].map(str::to_owned).to_vec(),
        }
    }
}

impl LoaderConfig {
    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(2);
                (cpus / 2).max(1)
            }
        }
    }

    /// Whether `path` has one of the configured extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

// ---------------------------------------------------------------------------
// ConfigRoot
// ---------------------------------------------------------------------------

/// A config tree on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    root: PathBuf,
}

impl ConfigRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Directory name holding overrides for `kind`.
    pub fn dir_name(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::Item => "Items",
            EntityKind::Piece => "Pieces",
            EntityKind::Monster => "Monsters",
        }
    }

    pub fn kind_dir(&self, kind: EntityKind) -> PathBuf {
        self.root.join(Self::dir_name(kind))
    }

    /// Create the root and every kind directory that does not exist yet.
    pub fn ensure_layout(&self) -> Result<(), ConfigError> {
        for kind in EntityKind::ALL {
            let dir = self.kind_dir(kind);
            std::fs::create_dir_all(&dir).map_err(|source| ConfigError::Io { path: dir, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_worker_count_clamps_zero() {
        let cfg = LoaderConfig {
            worker_count: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.resolved_worker_count(), 1);
    }

    #[test]
    fn resolved_worker_count_clamps_large() {
        let cfg = LoaderConfig {
            worker_count: Some(500),
            ..Default::default()
        };
        assert_eq!(cfg.resolved_worker_count(), 64);
    }

    #[test]
    fn auto_worker_count_is_at_least_one() {
        assert!(LoaderConfig::default().resolved_worker_count() >= 1);
    }

    #[test]
    fn extension_match_ignores_case() {
        let cfg = LoaderConfig::default();
        assert!(cfg.accepts(Path::new("a/Deer.json")));
        assert!(cfg.accepts(Path::new("a/Deer.JSON")));
        assert!(cfg.accepts(Path::new("a/Deer.yml")));
        assert!(cfg.accepts(Path::new("a/Deer.Yaml")));
        assert!(!cfg.accepts(Path::new("a/Deer.txt")));
        assert!(!cfg.accepts(Path::new("a/json")));
    }

    #[test]
    fn kind_dirs_live_under_the_root() {
        let root = ConfigRoot::new("/srv/overrides");
        assert_eq!(root.kind_dir(EntityKind::Item), Path::new("/srv/overrides/Items"));
        assert_eq!(root.kind_dir(EntityKind::Monster), Path::new("/srv/overrides/Monsters"));
    }
}
