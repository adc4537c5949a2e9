//! `patchwright` -- inspect, export and decode override config trees.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use patchwright_config::prelude::*;
use patchwright_core::codec::decode_snapshot;
use patchwright_core::descriptor::{ItemDescriptor, MonsterDescriptor, PieceDescriptor};
use patchwright_core::hash::fingerprint;
use patchwright_core::EntityKind;
use patchwright_engine::store::OverrideStore;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and export template override config trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the Items, Pieces and Monsters directories under a root.
    Init { root: PathBuf },
    /// Load a config root and print per-kind counts, payload sizes and
    /// fingerprints.
    Check {
        root: PathBuf,
        /// Parse workers. Defaults to half the available processors.
        #[arg(long)]
        workers: Option<usize>,
        /// Print load reports as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Load a config root and write one encoded payload per kind.
    Export {
        root: PathBuf,
        /// Directory to write `item.bin`, `piece.bin` and `monster.bin` to.
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Decode a payload file and print its entries as JSON.
    Dump {
        payload: PathBuf,
        #[arg(long, value_enum)]
        kind: KindArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Item,
    Piece,
    Monster,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Item => EntityKind::Item,
            KindArg::Piece => EntityKind::Piece,
            KindArg::Monster => EntityKind::Monster,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Init { root } => {
            ConfigRoot::new(&root).ensure_layout()?;
            info!(root = %root.display(), "config layout ready");
        }
        Command::Check { root, workers, json } => check(&root, workers, json)?,
        Command::Export { root, out, workers } => export(&root, &out, workers)?,
        Command::Dump { payload, kind } => dump(&payload, kind.into())?,
    }
    Ok(())
}

fn load(root: &Path, workers: Option<usize>) -> anyhow::Result<(OverrideStore, Vec<LoadReport>)> {
    let config = LoaderConfig {
        worker_count: workers,
        ..Default::default()
    };
    let store = OverrideStore::new();
    let reports = load_into_store(&ConfigRoot::new(root), &config, &store)
        .with_context(|| format!("loading {}", root.display()))?;
    Ok((store, reports))
}

fn check(root: &Path, workers: Option<usize>, json: bool) -> anyhow::Result<()> {
    let (store, reports) = load(root, workers)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!(
        "{:<8} {:>7} {:>6} {:>7} {:>9}  fingerprint",
        "kind", "entries", "files", "skipped", "bytes"
    );
    for report in &reports {
        let payload = store.export_payload(report.kind);
        println!(
            "{:<8} {:>7} {:>6} {:>7} {:>9}  {}",
            report.kind,
            report.entries,
            report.files,
            report.skipped_files,
            payload.len(),
            store.fingerprint(report.kind)
        );
    }
    Ok(())
}

fn export(root: &Path, out: &Path, workers: Option<usize>) -> anyhow::Result<()> {
    let (store, _) = load(root, workers)?;
    std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    for kind in EntityKind::ALL {
        let path = out.join(format!("{kind}.bin"));
        let payload = store.export_payload(kind);
        std::fs::write(&path, &payload).with_context(|| format!("writing {}", path.display()))?;
        info!(%kind, path = %path.display(), bytes = payload.len(), fingerprint = %fingerprint(&payload), "exported payload");
    }
    Ok(())
}

fn dump(path: &Path, kind: EntityKind) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = match kind {
        EntityKind::Item => serde_json::to_string_pretty(&decode_snapshot::<ItemDescriptor>(&bytes)?)?,
        EntityKind::Piece => serde_json::to_string_pretty(&decode_snapshot::<PieceDescriptor>(&bytes)?)?,
        EntityKind::Monster => serde_json::to_string_pretty(&decode_snapshot::<MonsterDescriptor>(&bytes)?)?,
    };
    println!("{text}");
    info!(%kind, fingerprint = %fingerprint(&bytes), "decoded payload");
    Ok(())
}
