//! Patchwright Config -- building override snapshots from a config tree.
//!
//! A config root holds one directory per kind:
//!
//! ```text
//! <root>/Items/**.{yml,yaml,json}
//! <root>/Pieces/**.{yml,yaml,json}
//! <root>/Monsters/**.{yml,yaml,json}
//! ```
//!
//! Each file holds either a batch mapping template names to records or a
//! single record named after the file stem. YAML and JSON files are read
//! the same way. Files are parsed on a worker pool and
//! the result is published to an [`OverrideStore`] as one snapshot per kind.
//!
//! [`OverrideStore`]: patchwright_engine::store::OverrideStore
//!
//! # Quick Start
//!
//! ```no_run
//! use patchwright_config::prelude::*;
//! use patchwright_engine::store::OverrideStore;
//!
//! let root = ConfigRoot::new("overrides");
//! root.ensure_layout().unwrap();
//!
//! let store = OverrideStore::new();
//! let reports = load_into_store(&root, &LoaderConfig::default(), &store).unwrap();
//! for report in reports {
//!     println!("{}: {} entries", report.kind, report.entries);
//! }
//! ```

#![deny(unsafe_code)]

pub mod layout;
pub mod loader;
pub mod parse;

use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while loading a config tree.
///
/// Only [`ConfigError::Io`] on a kind directory and [`ConfigError::Pool`]
/// abort a load. A file that fails to read or parse is skipped and counted
/// in the [`LoadReport`](loader::LoadReport).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A directory or file could not be read or created.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file parsed neither as a batch nor as a single record.
    #[error("failed to parse {}: {details}", path.display())]
    Parse { path: PathBuf, details: String },

    /// The loader's worker pool could not be started.
    #[error("failed to start loader pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::layout::{ConfigRoot, LoaderConfig};
    pub use crate::loader::{discover, load_into_store, load_kind, LoadReport};
    pub use crate::parse::parse_document;
    pub use crate::ConfigError;
}
