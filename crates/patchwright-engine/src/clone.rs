//! Synthetic templates cloned from an existing source template.
//!
//! A clone is created when an override names a `CloneSource` for a template
//! that does not exist yet. It lives until a later snapshot drops its entry
//! or points it at a different source, at which point it is torn down along
//! with every owned instance spawned from it and, for items, its recipe and
//! every tracked stack that references it.

use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

use patchwright_core::codec::Descriptor;
use patchwright_core::EntityKind;
use tracing::{debug, info, warn};

use crate::apply::Apply;
use crate::handle::Handle;
use crate::host::{HostRegistry, TemplateIndex};
use crate::tracker::LiveInstanceTracker;

// ---------------------------------------------------------------------------
// CloneRecord / ClonePlan
// ---------------------------------------------------------------------------

/// Everything needed to remove a clone from the host again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRecord {
    pub name: String,
    pub source: String,
    pub template: Handle,
    /// Indices the template was inserted into, in insertion order.
    pub indices: Vec<TemplateIndex>,
}

/// What a snapshot requires of the clone table.
#[derive(Debug, Clone, PartialEq)]
pub struct ClonePlan<D> {
    /// Existing clones to destroy.
    pub obsolete: BTreeSet<String>,
    /// `(name, source, descriptor)` for each clone to create, in creation
    /// order.
    pub to_create: Vec<(String, String, D)>,
}

/// Summary of a teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Teardown {
    pub templates: usize,
    pub instances: usize,
    pub stacks: usize,
    pub recipes: usize,
}

/// Snapshot entries ordered so that those with a clone source come first.
/// Order is otherwise the map's key order.
pub fn clone_sourced_first<D: Descriptor>(entries: &BTreeMap<String, D>) -> Vec<(&String, &D)> {
    let mut ordered: Vec<(&String, &D)> = entries.iter().collect();
    ordered.sort_by_key(|(_, d)| d.clone_source().is_none());
    ordered
}

// ---------------------------------------------------------------------------
// CloneManager
// ---------------------------------------------------------------------------

/// The clone table for one kind.
#[derive(Debug)]
pub struct CloneManager<D> {
    records: BTreeMap<String, CloneRecord>,
    _kind: PhantomData<fn() -> D>,
}

impl<D> Default for CloneManager<D> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            _kind: PhantomData,
        }
    }
}

impl<D: Apply> CloneManager<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CloneRecord> {
        self.records.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &CloneRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clones whose entry is gone from `entries` or whose clone source
    /// changed since they were created.
    pub fn obsolete(&self, entries: &BTreeMap<String, D>) -> BTreeSet<String> {
        self.records
            .values()
            .filter(|record| {
                entries
                    .get(&record.name)
                    .and_then(|d| d.clone_source())
                    .map_or(true, |source| source != record.source)
            })
            .map(|record| record.name.clone())
            .collect()
    }

    /// Work out which clones to destroy and which to create for `entries`.
    ///
    /// A create candidate is an entry with a clone source whose own name
    /// does not resolve, or resolves only to a clone that is about to be
    /// destroyed.
    pub fn plan<H: HostRegistry + ?Sized>(&self, host: &H, entries: &BTreeMap<String, D>) -> ClonePlan<D> {
        let obsolete = self.obsolete(entries);
        let to_create = clone_sourced_first(entries)
            .into_iter()
            .filter_map(|(name, d)| {
                let source = d.clone_source()?;
                let exists = host.lookup_template(D::KIND, name).is_some() && !obsolete.contains(name);
                (!exists).then(|| (name.clone(), source.to_owned(), d.clone()))
            })
            .collect();
        ClonePlan { obsolete, to_create }
    }

    /// Duplicate `source` as a new template called `name`, register it in
    /// every index the host uses for this kind, then apply `d` to it.
    ///
    /// Returns the apply skip count, or `None` if the source template could
    /// not be resolved or instantiated.
    pub fn create_clone<H: HostRegistry + ?Sized>(
        &mut self,
        host: &mut H,
        source: &str,
        name: &str,
        d: &D,
    ) -> Option<usize> {
        let kind = D::KIND;
        if let Some(stale) = self.records.remove(name) {
            // Detached by a host index rebuild without a reattach.
            warn!(%kind, clone = %name, "replacing clone that fell out of the host indices");
            release(host, kind, &stale);
        }
        let Some(source_handle) = host.lookup_template(kind, source) else {
            warn!(%kind, clone = %name, source = %source, "clone source not found; entry skipped");
            return None;
        };
        let Some(template) = host.instantiate_from(kind, source_handle) else {
            warn!(%kind, clone = %name, source = %source, "host refused to instantiate clone; entry skipped");
            return None;
        };
        host.set_template_name(kind, template, name);

        let indices = host.template_indices(kind).to_vec();
        for &index in &indices {
            host.insert_index(kind, index, name, template);
        }
        self.records.insert(
            name.to_owned(),
            CloneRecord {
                name: name.to_owned(),
                source: source.to_owned(),
                template,
                indices,
            },
        );

        let skipped = d.apply_to(host, name, template);
        info!(%kind, clone = %name, source = %source, "created clone");
        Some(skipped)
    }

    /// Tear down the named clones.
    ///
    /// Owned spawned instances go first, then (for items) tracked stacks and
    /// the clone's recipe, then each template is removed from its indices in
    /// reverse insertion order and destroyed.
    pub fn destroy_clones<H: HostRegistry + ?Sized>(
        &mut self,
        host: &mut H,
        tracker: &mut LiveInstanceTracker,
        names: &BTreeSet<String>,
    ) -> Teardown {
        let kind = D::KIND;
        let records: Vec<CloneRecord> = names.iter().filter_map(|n| self.records.remove(n)).collect();
        if records.is_empty() {
            return Teardown::default();
        }
        let mut teardown = Teardown::default();

        for instance in host.spawned_instances(kind) {
            let doomed = host
                .instance_template_name(kind, instance)
                .is_some_and(|t| names.contains(&t));
            if doomed && host.owns_instance(kind, instance) {
                host.destroy_instance(kind, instance);
                teardown.instances += 1;
            }
        }

        if kind == EntityKind::Item {
            teardown.stacks = tracker.remove_stacks_matching(host, names);
            teardown.recipes = records
                .iter()
                .filter(|record| host.remove_recipe(&record.name).is_some())
                .count();
        }

        for record in records {
            release(host, kind, &record);
            debug!(%kind, clone = %record.name, "destroyed clone");
            teardown.templates += 1;
        }

        info!(
            %kind,
            templates = teardown.templates,
            instances = teardown.instances,
            stacks = teardown.stacks,
            recipes = teardown.recipes,
            "tore down obsolete clones"
        );
        teardown
    }

    /// Insert every clone back into the indices it was registered in.
    /// Hosts call this after rebuilding their own registries.
    pub fn reattach<H: HostRegistry + ?Sized>(&self, host: &mut H) -> usize {
        for record in self.records.values() {
            for &index in &record.indices {
                host.insert_index(D::KIND, index, &record.name, record.template);
            }
        }
        self.records.len()
    }
}

/// Remove a clone's template from its indices, newest first, and destroy it.
fn release<H: HostRegistry + ?Sized>(host: &mut H, kind: EntityKind, record: &CloneRecord) {
    for &index in record.indices.iter().rev() {
        host.remove_index(kind, index, &record.name, record.template);
    }
    host.destroy_template(kind, record.template);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_host::MemoryHost;
    use crate::model::CreatureData;
    use patchwright_core::descriptor::MonsterDescriptor;

    fn monster(source: &str) -> MonsterDescriptor {
        MonsterDescriptor {
            clone_source: source.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn clone_sourced_entries_sort_first_and_stay_stable() {
        let mut entries = BTreeMap::new();
        entries.insert("A".to_owned(), monster(""));
        entries.insert("B".to_owned(), monster("X"));
        entries.insert("C".to_owned(), monster(""));
        entries.insert("D".to_owned(), monster("Y"));

        let names: Vec<&str> = clone_sourced_first(&entries)
            .into_iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn obsolete_when_dropped_or_source_changed() {
        let mut manager = CloneManager::<MonsterDescriptor>::new();
        for (name, source) in [("Kept", "Boar"), ("Dropped", "Boar"), ("Moved", "Boar")] {
            manager.records.insert(
                name.to_owned(),
                CloneRecord {
                    name: name.to_owned(),
                    source: source.to_owned(),
                    template: Handle::new(0, 0),
                    indices: vec![TemplateIndex::ByName],
                },
            );
        }

        let mut entries = BTreeMap::new();
        entries.insert("Kept".to_owned(), monster("Boar"));
        entries.insert("Moved".to_owned(), monster("Wolf"));

        let obsolete = manager.obsolete(&entries);
        assert_eq!(
            obsolete.into_iter().collect::<Vec<_>>(),
            vec!["Dropped".to_owned(), "Moved".to_owned()]
        );
    }

    #[test]
    fn plan_creates_only_unresolved_clone_sourced_entries() {
        let mut host = MemoryHost::new();
        host.add_creature("Deer", CreatureData::default());
        host.add_creature("DeerBoss", CreatureData::default());

        let mut entries = BTreeMap::new();
        entries.insert("Deer".to_owned(), monster(""));
        entries.insert("DeerBoss".to_owned(), monster("Deer"));
        entries.insert("DeerKing".to_owned(), monster("Deer"));
        entries.insert("Wolf".to_owned(), monster(""));

        let plan = CloneManager::<MonsterDescriptor>::new().plan(&host, &entries);
        assert!(plan.obsolete.is_empty());
        let names: Vec<&str> = plan.to_create.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, vec!["DeerKing"]);
        assert_eq!(plan.to_create[0].1, "Deer");
    }

    #[test]
    fn created_clone_is_recorded_with_its_indices() {
        let mut host = MemoryHost::new();
        host.add_creature(
            "Deer",
            CreatureData {
                health: 30.0,
                ..Default::default()
            },
        );
        let mut manager = CloneManager::<MonsterDescriptor>::new();
        let d = MonsterDescriptor {
            clone_source: "Deer".to_owned(),
            health: Some(300),
            ..Default::default()
        };

        assert_eq!(manager.create_clone(&mut host, "Deer", "DeerKing", &d), Some(0));
        let record = manager.get("DeerKing").unwrap();
        assert_eq!(record.indices, vec![TemplateIndex::ByName, TemplateIndex::ByHash]);
        assert_eq!(host.creature_data(record.template).unwrap().health, 300.0);

        assert_eq!(manager.create_clone(&mut host, "Dragon", "DragonKing", &d), None);
        assert_eq!(manager.len(), 1);
    }
}
