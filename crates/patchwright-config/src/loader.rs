//! Discovery and parallel loading of a kind's config files.
//!
//! Files are split into one contiguous partition per worker. Each worker
//! parses its partition into a local list with its own read buffer, then
//! takes the shared accumulation lock exactly once to merge. Lock traffic
//! per load is bounded by the worker count, not the file count.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use patchwright_core::codec::Descriptor;
use patchwright_core::descriptor::{ItemDescriptor, MonsterDescriptor, PieceDescriptor};
use patchwright_core::EntityKind;
use patchwright_engine::store::{OverrideStore, Stored};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::layout::{ConfigRoot, LoaderConfig};
use crate::parse::parse_document;
use crate::ConfigError;

// ---------------------------------------------------------------------------
// LoadReport
// ---------------------------------------------------------------------------

/// Outcome of loading one kind's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub kind: EntityKind,
    /// Files that parsed.
    pub files: usize,
    /// Files skipped because they could not be read or parsed.
    pub skipped_files: usize,
    /// Distinct template names loaded.
    pub entries: usize,
    /// Entries that replaced an earlier entry with the same name.
    pub duplicates: usize,
    pub workers: usize,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Every file under `dir`, at any depth, that `config` accepts. Sorted by
/// path. A missing directory yields no files.
pub fn discover(dir: &Path, config: &LoaderConfig) -> Result<Vec<PathBuf>, ConfigError> {
    let mut found = Vec::new();
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "config directory missing; nothing to load");
        return Ok(found);
    }

    let mut pending = vec![dir.to_path_buf()];
    while let Some(next) = pending.pop() {
        let io_err = |source| ConfigError::Io {
            path: next.clone(),
            source,
        };
        for entry in std::fs::read_dir(&next).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_dir() {
                pending.push(path);
            } else if config.accepts(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

struct Partition<D> {
    entries: Vec<(String, D, PathBuf)>,
    files: usize,
    skipped_files: usize,
}

impl<D> Default for Partition<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            files: 0,
            skipped_files: 0,
        }
    }
}

fn load_partition<D>(paths: &[PathBuf]) -> Partition<D>
where
    D: DeserializeOwned + Default + PartialEq,
{
    let mut part = Partition::default();
    let mut buf = String::new();
    for path in paths {
        buf.clear();
        if let Err(err) = File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            warn!(path = %path.display(), error = %err, "unreadable config file; skipped");
            part.skipped_files += 1;
            continue;
        }
        match parse_document::<D>(path, &buf) {
            Ok(entries) => {
                debug!(path = %path.display(), entries = entries.len(), "parsed config file");
                part.files += 1;
                part.entries
                    .extend(entries.into_iter().map(|(name, d)| (name, d, path.clone())));
            }
            Err(err) => {
                warn!(error = %err, "config file skipped");
                part.skipped_files += 1;
            }
        }
    }
    part
}

struct Accumulator<D> {
    entries: BTreeMap<String, D>,
    files: usize,
    skipped_files: usize,
    duplicates: usize,
}

impl<D> Accumulator<D> {
    fn absorb(&mut self, part: Partition<D>) {
        self.files += part.files;
        self.skipped_files += part.skipped_files;
        for (name, d, path) in part.entries {
            if self.entries.insert(name.clone(), d).is_some() {
                warn!(template = %name, path = %path.display(), "duplicate override; later entry wins");
                self.duplicates += 1;
            }
        }
    }
}

/// Load every accepted file under `dir` as descriptors of kind `D`.
///
/// When two files define the same template name, whichever merges last
/// wins. Across workers that order is not deterministic.
pub fn load_kind<D>(dir: &Path, config: &LoaderConfig) -> Result<(BTreeMap<String, D>, LoadReport), ConfigError>
where
    D: Descriptor + DeserializeOwned + Default,
{
    let paths = discover(dir, config)?;
    let workers = config.resolved_worker_count().min(paths.len()).max(1);
    let chunk = paths.len().div_ceil(workers).max(1);

    let merged = Mutex::new(Accumulator {
        entries: BTreeMap::new(),
        files: 0,
        skipped_files: 0,
        duplicates: 0,
    });

    if workers == 1 {
        merged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .absorb(load_partition::<D>(&paths));
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("patchwright-load-{i}"))
            .build()?;
        pool.scope(|scope| {
            for part in paths.chunks(chunk) {
                let merged = &merged;
                scope.spawn(move |_| {
                    let local = load_partition::<D>(part);
                    merged
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .absorb(local);
                });
            }
        });
    }

    let acc = merged.into_inner().unwrap_or_else(PoisonError::into_inner);
    let report = LoadReport {
        kind: D::KIND,
        files: acc.files,
        skipped_files: acc.skipped_files,
        entries: acc.entries.len(),
        duplicates: acc.duplicates,
        workers,
    };
    info!(
        kind = %report.kind,
        dir = %dir.display(),
        files = report.files,
        skipped_files = report.skipped_files,
        entries = report.entries,
        workers,
        "loaded overrides"
    );
    Ok((acc.entries, report))
}

fn load_and_publish<D>(root: &ConfigRoot, config: &LoaderConfig, store: &OverrideStore) -> Result<LoadReport, ConfigError>
where
    D: Stored + DeserializeOwned + Default,
{
    let (entries, report) = load_kind::<D>(&root.kind_dir(D::KIND), config)?;
    store.publish(entries);
    Ok(report)
}

/// Load every kind under `root` and publish each as a new snapshot, in
/// item, piece, monster order.
pub fn load_into_store(
    root: &ConfigRoot,
    config: &LoaderConfig,
    store: &OverrideStore,
) -> Result<Vec<LoadReport>, ConfigError> {
    Ok(vec![
        load_and_publish::<ItemDescriptor>(root, config, store)?,
        load_and_publish::<PieceDescriptor>(root, config, store)?,
        load_and_publish::<MonsterDescriptor>(root, config, store)?,
    ])
}
