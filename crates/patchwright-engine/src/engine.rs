//! The reconciliation pass.
//!
//! For one kind, a pass brings the host in line with a freshly published
//! snapshot:
//!
//! 1. Destroy clones the snapshot no longer wants.
//! 2. Re-apply last pass's descriptors to their templates.
//! 3. Re-apply them to spawned instances (and, for items, tracked stacks).
//! 4. Forget last pass's record.
//! 5. Apply the new snapshot to templates, creating clones as needed.
//! 6. Apply it to spawned instances.
//! 7. For items, apply it to tracked stacks.
//!
//! Patching is monotonic. A field a later snapshot omits keeps whatever an
//! earlier snapshot set; nothing is ever restored to a pristine value.
//!
//! Passes run on the thread that owns the host registries. Taking
//! `&mut self` keeps a pass from being re-entered, and [`poll`] runs at most
//! one pass per kind for any number of intervening publishes.
//!
//! [`poll`]: ReconciliationEngine::poll

use std::collections::{BTreeMap, BTreeSet};

use patchwright_core::descriptor::{ItemDescriptor, MonsterDescriptor, PieceDescriptor};
use patchwright_core::EntityKind;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::apply::Apply;
use crate::clone::{clone_sourced_first, CloneManager, ClonePlan};
use crate::host::{ContainerId, HostRegistry};
use crate::store::{OverrideStore, Snapshot, Stored};
use crate::tracker::LiveInstanceTracker;
use crate::EngineError;

// ---------------------------------------------------------------------------
// PassReport
// ---------------------------------------------------------------------------

/// What one pass did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub kind: EntityKind,
    /// Store version the pass reconciled against.
    pub version: u64,
    /// Fingerprint of the snapshot the pass reconciled against.
    pub fingerprint: String,
    /// Templates re-patched with last pass's descriptors.
    pub reasserted: usize,
    /// Existing templates patched with the new snapshot.
    pub templates: usize,
    /// Spawned instances patched with the new snapshot.
    pub instances: usize,
    /// Tracked container stacks patched with the new snapshot.
    pub stacks: usize,
    pub clones_created: usize,
    pub clones_destroyed: usize,
    /// Instances and stacks removed along with obsolete clones.
    pub clone_instances_removed: usize,
    /// Entries and sub-entries skipped because a name did not resolve.
    pub skipped: usize,
}

impl PassReport {
    fn new(kind: EntityKind, version: u64, fingerprint: String) -> Self {
        Self {
            kind,
            version,
            fingerprint,
            reasserted: 0,
            templates: 0,
            instances: 0,
            stacks: 0,
            clones_created: 0,
            clones_destroyed: 0,
            clone_instances_removed: 0,
            skipped: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// KindState
// ---------------------------------------------------------------------------

/// Engine-owned state for one kind.
#[derive(Debug)]
pub struct KindState<D> {
    applied: BTreeMap<String, D>,
    clones: CloneManager<D>,
    last_version: u64,
}

impl<D: Apply> Default for KindState<D> {
    fn default() -> Self {
        Self {
            applied: BTreeMap::new(),
            clones: CloneManager::new(),
            last_version: 0,
        }
    }
}

impl<D: Apply> KindState<D> {
    /// Descriptors applied to templates by the last pass, by template name.
    pub fn applied(&self) -> &BTreeMap<String, D> {
        &self.applied
    }

    pub fn clones(&self) -> &CloneManager<D> {
        &self.clones
    }

    /// Store version of the last completed pass.
    pub fn last_version(&self) -> u64 {
        self.last_version
    }
}

/// A descriptor kind the engine runs passes for.
pub trait Reconcile: Apply + Stored {
    #[doc(hidden)]
    fn split(engine: &mut ReconciliationEngine) -> (&mut KindState<Self>, &mut LiveInstanceTracker);

    fn state(engine: &ReconciliationEngine) -> &KindState<Self>;
}

impl Reconcile for ItemDescriptor {
    fn split(engine: &mut ReconciliationEngine) -> (&mut KindState<Self>, &mut LiveInstanceTracker) {
        (&mut engine.items, &mut engine.tracker)
    }

    fn state(engine: &ReconciliationEngine) -> &KindState<Self> {
        &engine.items
    }
}

impl Reconcile for PieceDescriptor {
    fn split(engine: &mut ReconciliationEngine) -> (&mut KindState<Self>, &mut LiveInstanceTracker) {
        (&mut engine.pieces, &mut engine.tracker)
    }

    fn state(engine: &ReconciliationEngine) -> &KindState<Self> {
        &engine.pieces
    }
}

impl Reconcile for MonsterDescriptor {
    fn split(engine: &mut ReconciliationEngine) -> (&mut KindState<Self>, &mut LiveInstanceTracker) {
        (&mut engine.monsters, &mut engine.tracker)
    }

    fn state(engine: &ReconciliationEngine) -> &KindState<Self> {
        &engine.monsters
    }
}

// ---------------------------------------------------------------------------
// ReconciliationEngine
// ---------------------------------------------------------------------------

/// Owns the applied-record and clone tables for every kind, plus the
/// container tracker. One per process.
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    items: KindState<ItemDescriptor>,
    pieces: KindState<PieceDescriptor>,
    monsters: KindState<MonsterDescriptor>,
    tracker: LiveInstanceTracker,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state<D: Reconcile>(&self) -> &KindState<D> {
        D::state(self)
    }

    pub fn tracker(&self) -> &LiveInstanceTracker {
        &self.tracker
    }

    /// Hosts call this whenever they construct a container-like object.
    pub fn register_container(&mut self, container: ContainerId) {
        self.tracker.register_container(container);
    }

    pub fn unregister_container(&mut self, container: ContainerId) {
        self.tracker.unregister_container(container);
    }

    /// Run one pass for kind `D` against `snapshot`.
    ///
    /// Fails only with [`EngineError::RegistryUnavailable`], in which case
    /// nothing was touched.
    pub fn run_pass<D, H>(&mut self, host: &mut H, snapshot: &Snapshot<D>) -> Result<PassReport, EngineError>
    where
        D: Reconcile,
        H: HostRegistry + ?Sized,
    {
        let kind = D::KIND;
        if !host.is_ready(kind) {
            warn!(%kind, version = snapshot.version(), "host registry not ready; pass skipped");
            return Err(EngineError::RegistryUnavailable { kind });
        }

        let (state, tracker) = D::split(self);
        let entries = snapshot.entries();
        let mut report = PassReport::new(kind, snapshot.version(), snapshot.fingerprint().to_owned());

        // 1. obsolete clones
        let ClonePlan { obsolete, to_create } = state.clones.plan(&*host, entries);
        if !obsolete.is_empty() {
            let teardown = state.clones.destroy_clones(host, tracker, &obsolete);
            report.clones_destroyed = teardown.templates;
            report.clone_instances_removed = teardown.instances + teardown.stacks;
        }

        // 2-4. reassert last pass, then forget it
        let previous = std::mem::take(&mut state.applied);
        for (name, d) in &previous {
            match host.lookup_template(kind, name) {
                Some(template) => {
                    d.apply_to(host, name, template);
                    report.reasserted += 1;
                }
                None => debug!(%kind, template = %name, "reassert target gone; dropped"),
            }
        }
        patch_instances(host, &previous);
        D::apply_to_stacks(&previous, host, tracker);

        // 5. new snapshot onto templates; planned clones are created first
        // and recorded as applied from the next pass on
        for (name, source, d) in &to_create {
            match state.clones.create_clone(host, source, name, d) {
                Some(skipped) => {
                    report.clones_created += 1;
                    report.skipped += skipped;
                }
                None => report.skipped += 1,
            }
        }
        let planned: BTreeSet<&str> = to_create.iter().map(|(name, _, _)| name.as_str()).collect();
        for (name, d) in clone_sourced_first(entries) {
            if planned.contains(name.as_str()) {
                continue;
            }
            match host.lookup_template(kind, name) {
                Some(template) => {
                    state.applied.insert(name.clone(), d.clone());
                    report.skipped += d.apply_to(host, name, template);
                    report.templates += 1;
                }
                None => {
                    warn!(%kind, template = %name, "no template with this name; entry skipped");
                    report.skipped += 1;
                }
            }
        }

        // 6-7. new snapshot onto live copies
        let (instances, skipped) = patch_instances(host, entries);
        report.instances = instances;
        report.skipped += skipped;
        report.stacks = D::apply_to_stacks(entries, host, tracker);

        state.last_version = snapshot.version();
        info!(
            %kind,
            version = report.version,
            fingerprint = %report.fingerprint,
            templates = report.templates,
            instances = report.instances,
            stacks = report.stacks,
            clones_created = report.clones_created,
            clones_destroyed = report.clones_destroyed,
            skipped = report.skipped,
            "reconciliation pass complete"
        );
        Ok(report)
    }

    /// Run the pass for kind `D` against the store's current snapshot.
    pub fn reconcile<D, H>(&mut self, host: &mut H, store: &OverrideStore) -> Result<PassReport, EngineError>
    where
        D: Reconcile,
        H: HostRegistry + ?Sized,
    {
        let snapshot = store.snapshot::<D>();
        self.run_pass(host, &snapshot)
    }

    /// Run the item, piece and monster passes in that order. Items go first
    /// so cloned items exist before pieces reference them. Kinds whose
    /// registry is unavailable are skipped.
    pub fn reconcile_all<H>(&mut self, host: &mut H, store: &OverrideStore) -> Vec<PassReport>
    where
        H: HostRegistry + ?Sized,
    {
        [
            self.reconcile::<ItemDescriptor, H>(host, store),
            self.reconcile::<PieceDescriptor, H>(host, store),
            self.reconcile::<MonsterDescriptor, H>(host, store),
        ]
        .into_iter()
        .filter_map(Result::ok)
        .collect()
    }

    /// Run one pass for each kind whose store version moved since its last
    /// completed pass. Any number of publishes in between collapse into a
    /// single pass against the latest snapshot.
    pub fn poll<H>(&mut self, host: &mut H, store: &OverrideStore) -> Vec<PassReport>
    where
        H: HostRegistry + ?Sized,
    {
        let mut reports = Vec::new();
        reports.extend(self.poll_kind::<ItemDescriptor, H>(host, store));
        reports.extend(self.poll_kind::<PieceDescriptor, H>(host, store));
        reports.extend(self.poll_kind::<MonsterDescriptor, H>(host, store));
        reports
    }

    fn poll_kind<D, H>(&mut self, host: &mut H, store: &OverrideStore) -> Option<PassReport>
    where
        D: Reconcile,
        H: HostRegistry + ?Sized,
    {
        if store.version(D::KIND) == D::state(self).last_version {
            return None;
        }
        self.reconcile::<D, H>(host, store).ok()
    }

    /// Put every live clone back into the host's template indices after the
    /// host rebuilt them. Returns how many clones were reattached.
    pub fn reattach_clones<H: HostRegistry + ?Sized>(&self, host: &mut H) -> usize {
        let count = self.items.clones.reattach(host)
            + self.pieces.clones.reattach(host)
            + self.monsters.clones.reattach(host);
        if count > 0 {
            info!(count, "reattached clones to host indices");
        }
        count
    }
}

/// Apply each entry to every spawned instance of its template. Returns
/// `(instances patched, sub-entries skipped)`.
fn patch_instances<D, H>(host: &mut H, entries: &BTreeMap<String, D>) -> (usize, usize)
where
    D: Apply,
    H: HostRegistry + ?Sized,
{
    if entries.is_empty() {
        return (0, 0);
    }
    let kind = D::KIND;
    let mut patched = 0;
    let mut skipped = 0;
    for instance in host.spawned_instances(kind) {
        let Some(template) = host.instance_template_name(kind, instance) else {
            continue;
        };
        if let Some(d) = entries.get(&template) {
            skipped += d.apply_to(host, &template, instance);
            patched += 1;
        }
    }
    (patched, skipped)
}
