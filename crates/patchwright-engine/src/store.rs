//! The published override set, one snapshot per kind.
//!
//! A snapshot is immutable once published. Publishing swaps a new
//! `Arc<Snapshot>` into an [`ArcSwap`], so readers never block and either
//! see the old mapping or the new one in full. Each publish bumps the kind's version,
//! which is how the engine notices work to do, and sends a [`ChangeNotice`]
//! to every subscriber.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use crossbeam_channel::{unbounded, Receiver, Sender};

use patchwright_core::codec::{decode_snapshot, encode_snapshot, Descriptor};
use patchwright_core::descriptor::{ItemDescriptor, MonsterDescriptor, PieceDescriptor};
use patchwright_core::hash::fingerprint;
use patchwright_core::EntityKind;
use tracing::info;

use crate::EngineError;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One complete, immutable override mapping for a kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<D> {
    entries: BTreeMap<String, D>,
    version: u64,
    fingerprint: String,
}

impl<D: Descriptor> Snapshot<D> {
    fn new(entries: BTreeMap<String, D>, version: u64) -> Self {
        let fingerprint = fingerprint(&encode_snapshot(&entries));
        Self {
            entries,
            version,
            fingerprint,
        }
    }

    pub fn entries(&self) -> &BTreeMap<String, D> {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&D> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store version this snapshot was published as. Zero means nothing has
    /// been published yet.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// BLAKE3 hex digest of the snapshot's encoded payload.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Sent to subscribers after each publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub kind: EntityKind,
    pub version: u64,
    pub fingerprint: String,
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Storage for one kind's current snapshot.
///
/// Reads are lock-free. Publishers serialize on `publishing` so versions
/// stay strictly increasing.
#[derive(Debug)]
pub struct SnapshotSlot<D> {
    current: ArcSwap<Snapshot<D>>,
    publishing: Mutex<()>,
}

impl<D: Descriptor> Default for SnapshotSlot<D> {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::new(BTreeMap::new(), 0)),
            publishing: Mutex::new(()),
        }
    }
}

impl<D: Descriptor> SnapshotSlot<D> {
    fn load(&self) -> Arc<Snapshot<D>> {
        self.current.load_full()
    }

    fn replace(&self, entries: BTreeMap<String, D>) -> Arc<Snapshot<D>> {
        let _guard = self.publishing.lock().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(Snapshot::new(entries, self.current.load().version + 1));
        self.current.store(Arc::clone(&next));
        next
    }
}

/// Descriptor kinds the store holds a slot for.
pub trait Stored: Descriptor {
    fn slot(store: &OverrideStore) -> &SnapshotSlot<Self>;
}

impl Stored for ItemDescriptor {
    fn slot(store: &OverrideStore) -> &SnapshotSlot<Self> {
        &store.items
    }
}

impl Stored for PieceDescriptor {
    fn slot(store: &OverrideStore) -> &SnapshotSlot<Self> {
        &store.pieces
    }
}

impl Stored for MonsterDescriptor {
    fn slot(store: &OverrideStore) -> &SnapshotSlot<Self> {
        &store.monsters
    }
}

// ---------------------------------------------------------------------------
// OverrideStore
// ---------------------------------------------------------------------------

/// Thread-safe holder of the current override snapshots.
///
/// Any thread may publish; reconciliation reads from the simulation thread.
#[derive(Debug, Default)]
pub struct OverrideStore {
    items: SnapshotSlot<ItemDescriptor>,
    pieces: SnapshotSlot<PieceDescriptor>,
    monsters: SnapshotSlot<MonsterDescriptor>,
    subscribers: Mutex<Vec<Sender<ChangeNotice>>>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot for kind `D`.
    pub fn snapshot<D: Stored>(&self) -> Arc<Snapshot<D>> {
        D::slot(self).load()
    }

    /// Replace kind `D`'s snapshot wholesale and notify subscribers.
    pub fn publish<D: Stored>(&self, entries: BTreeMap<String, D>) -> Arc<Snapshot<D>> {
        let snapshot = D::slot(self).replace(entries);
        info!(
            kind = %D::KIND,
            version = snapshot.version(),
            entries = snapshot.len(),
            fingerprint = %snapshot.fingerprint(),
            "published overrides"
        );
        self.notify(ChangeNotice {
            kind: D::KIND,
            version: snapshot.version(),
            fingerprint: snapshot.fingerprint().to_owned(),
        });
        snapshot
    }

    /// Version of the current snapshot for `kind`.
    pub fn version(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Item => self.items.load().version(),
            EntityKind::Piece => self.pieces.load().version(),
            EntityKind::Monster => self.monsters.load().version(),
        }
    }

    /// Fingerprint of the current snapshot for `kind`.
    pub fn fingerprint(&self, kind: EntityKind) -> String {
        match kind {
            EntityKind::Item => self.items.load().fingerprint().to_owned(),
            EntityKind::Piece => self.pieces.load().fingerprint().to_owned(),
            EntityKind::Monster => self.monsters.load().fingerprint().to_owned(),
        }
    }

    /// Receive a [`ChangeNotice`] for every later publish.
    pub fn subscribe(&self) -> Receiver<ChangeNotice> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn notify(&self, notice: ChangeNotice) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(notice.clone()).is_ok());
    }

    // -- replication --------------------------------------------------------

    /// Encode the current snapshot for `kind` for replication.
    pub fn export_payload(&self, kind: EntityKind) -> Vec<u8> {
        match kind {
            EntityKind::Item => encode_snapshot(self.items.load().entries()),
            EntityKind::Piece => encode_snapshot(self.pieces.load().entries()),
            EntityKind::Monster => encode_snapshot(self.monsters.load().entries()),
        }
    }

    /// Decode a replicated payload and publish it. A payload that fails to
    /// decode leaves the current snapshot in place. Returns the new version.
    pub fn import_payload(&self, kind: EntityKind, bytes: &[u8]) -> Result<u64, EngineError> {
        let version = match kind {
            EntityKind::Item => self.publish(decode_snapshot::<ItemDescriptor>(bytes)?).version(),
            EntityKind::Piece => self.publish(decode_snapshot::<PieceDescriptor>(bytes)?).version(),
            EntityKind::Monster => self.publish(decode_snapshot::<MonsterDescriptor>(bytes)?).version(),
        };
        Ok(version)
    }

    // -- attack hook --------------------------------------------------------

    /// Damage multiplier to fold into an attack by a creature spawned from
    /// template `creature`. `None` means no override; hosts use `1.0`.
    pub fn attack_damage_multiplier(&self, creature: &str) -> Option<f32> {
        self.monsters.load().get(creature)?.damage_multiplier
    }
}
