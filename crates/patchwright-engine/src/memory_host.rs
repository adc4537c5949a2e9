//! An in-memory [`HostRegistry`].
//!
//! `MemoryHost` models just enough of a simulation to reconcile against:
//! named templates per kind behind the three template indices, spawned
//! instances that copy their template's data, a recipe book, crafting
//! stations, and containers of item stacks. Tests and tools use it as the
//! reference host.
//!
//! # Example
//!
//! ```
//! use patchwright_core::EntityKind;
//! use patchwright_engine::prelude::*;
//!
//! let mut host = MemoryHost::new();
//! host.add_creature("Deer", CreatureData { health: 30.0, ..Default::default() });
//! let deer = host.spawn(EntityKind::Monster, "Deer").unwrap();
//! assert_eq!(host.creature_data(deer).unwrap().health, 30.0);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use patchwright_core::hash::stable_hash;
use patchwright_core::EntityKind;

use crate::handle::{Handle, HandleAllocator};
use crate::host::{ContainerId, HostRegistry, TemplateIndex};
use crate::model::{CreatureData, ItemData, ItemStack, PieceData, Recipe};

#[derive(Debug, Default)]
struct KindTables {
    by_name: BTreeMap<String, Handle>,
    by_hash: BTreeMap<i32, Handle>,
    /// Instances in spawn order, with the template each came from.
    instances: Vec<(Handle, String)>,
}

/// Reference host backed by ordered maps.
#[derive(Debug)]
pub struct MemoryHost {
    handles: HandleAllocator,
    unready: BTreeSet<EntityKind>,
    tables: [KindTables; 3],
    /// Item data handle to owning template.
    by_data: BTreeMap<Handle, Handle>,
    template_names: BTreeMap<Handle, String>,
    remote: BTreeSet<Handle>,
    items: BTreeMap<Handle, ItemData>,
    pieces: BTreeMap<Handle, PieceData>,
    creatures: BTreeMap<Handle, CreatureData>,
    recipes: BTreeMap<String, Recipe>,
    stations: BTreeSet<String>,
    containers: BTreeMap<ContainerId, Vec<ItemStack>>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            handles: HandleAllocator::new(),
            unready: BTreeSet::new(),
            tables: Default::default(),
            by_data: BTreeMap::new(),
            template_names: BTreeMap::new(),
            remote: BTreeSet::new(),
            items: BTreeMap::new(),
            pieces: BTreeMap::new(),
            creatures: BTreeMap::new(),
            recipes: BTreeMap::new(),
            stations: BTreeSet::new(),
            containers: BTreeMap::new(),
        }
    }

    fn tables(&self, kind: EntityKind) -> &KindTables {
        &self.tables[kind.index()]
    }

    fn tables_mut(&mut self, kind: EntityKind) -> &mut KindTables {
        &mut self.tables[kind.index()]
    }

    fn register(&mut self, kind: EntityKind, name: &str, handle: Handle) {
        self.template_names.insert(handle, name.to_owned());
        let indices = self.template_indices(kind);
        for &index in indices {
            self.insert_index(kind, index, name, handle);
        }
    }

    // -- authoring ----------------------------------------------------------

    pub fn add_item(&mut self, name: &str, data: ItemData) -> Handle {
        let handle = self.handles.allocate();
        self.items.insert(handle, data);
        self.register(EntityKind::Item, name, handle);
        handle
    }

    pub fn add_piece(&mut self, name: &str, data: PieceData) -> Handle {
        let handle = self.handles.allocate();
        self.pieces.insert(handle, data);
        self.register(EntityKind::Piece, name, handle);
        handle
    }

    pub fn add_creature(&mut self, name: &str, data: CreatureData) -> Handle {
        let handle = self.handles.allocate();
        self.creatures.insert(handle, data);
        self.register(EntityKind::Monster, name, handle);
        handle
    }

    pub fn add_crafting_station(&mut self, name: &str) {
        self.stations.insert(name.to_owned());
    }

    pub fn set_ready(&mut self, kind: EntityKind, ready: bool) {
        if ready {
            self.unready.remove(&kind);
        } else {
            self.unready.insert(kind);
        }
    }

    /// Spawn an instance of template `name`, owned by this process.
    pub fn spawn(&mut self, kind: EntityKind, name: &str) -> Option<Handle> {
        let template = self.lookup_template(kind, name)?;
        let instance = self.copy_data(kind, template)?;
        self.tables_mut(kind).instances.push((instance, name.to_owned()));
        Some(instance)
    }

    /// Spawn an instance owned by some other process.
    pub fn spawn_remote(&mut self, kind: EntityKind, name: &str) -> Option<Handle> {
        let instance = self.spawn(kind, name)?;
        self.remote.insert(instance);
        Some(instance)
    }

    fn copy_data(&mut self, kind: EntityKind, source: Handle) -> Option<Handle> {
        let handle = self.handles.allocate();
        let copied = match kind {
            EntityKind::Item => self.items.get(&source).cloned().map(|d| {
                self.items.insert(handle, d);
            }),
            EntityKind::Piece => self.pieces.get(&source).cloned().map(|d| {
                self.pieces.insert(handle, d);
            }),
            EntityKind::Monster => self.creatures.get(&source).cloned().map(|d| {
                self.creatures.insert(handle, d);
            }),
        };
        if copied.is_none() {
            self.handles.release(handle);
        }
        copied.map(|()| handle)
    }

    /// Create an empty container.
    pub fn create_container(&mut self) -> ContainerId {
        let id = ContainerId(self.handles.allocate());
        self.containers.insert(id, Vec::new());
        id
    }

    pub fn destroy_container(&mut self, container: ContainerId) {
        if self.containers.remove(&container).is_some() {
            self.handles.release(container.0);
        }
    }

    /// Put a stack of item template `name` into `container`, copying the
    /// template's current data.
    pub fn add_stack(&mut self, container: ContainerId, name: &str, stack: i32) -> Option<usize> {
        let template = self.lookup_template(EntityKind::Item, name)?;
        let data = self.items.get(&template)?.clone();
        let stacks = self.containers.get_mut(&container)?;
        stacks.push(ItemStack {
            drop_template: Some(name.to_owned()),
            data,
            stack,
        });
        Some(stacks.len() - 1)
    }

    // -- inspection ---------------------------------------------------------

    /// Registry name of a template.
    pub fn template_name(&self, template: Handle) -> Option<&str> {
        self.template_names.get(&template).map(String::as_str)
    }

    pub fn is_indexed(&self, kind: EntityKind, index: TemplateIndex, name: &str) -> bool {
        let tables = self.tables(kind);
        match index {
            TemplateIndex::ByName => tables.by_name.contains_key(name),
            TemplateIndex::ByHash => tables.by_hash.contains_key(&stable_hash(name)),
            TemplateIndex::ByDataIdentity => tables
                .by_name
                .get(name)
                .is_some_and(|h| self.by_data.contains_key(h)),
        }
    }

    pub fn lookup_by_hash(&self, kind: EntityKind, hash: i32) -> Option<Handle> {
        self.tables(kind).by_hash.get(&hash).copied()
    }

    /// Instances of `kind` spawned from template `name`.
    pub fn instances_of(&self, kind: EntityKind, name: &str) -> Vec<Handle> {
        self.tables(kind)
            .instances
            .iter()
            .filter(|(_, t)| t == name)
            .map(|(h, _)| *h)
            .collect()
    }

    pub fn stacks(&self, container: ContainerId) -> &[ItemStack] {
        self.containers.get(&container).map_or(&[], Vec::as_slice)
    }

    /// Drop every index entry for `kind`, as a host does when it rebuilds
    /// its registries from scratch, then re-register authored templates.
    pub fn rebuild_indices(&mut self, kind: EntityKind, authored: &[(&str, Handle)]) {
        let tables = self.tables_mut(kind);
        tables.by_name.clear();
        tables.by_hash.clear();
        if kind == EntityKind::Item {
            self.by_data.clear();
        }
        for &(name, handle) in authored {
            self.register(kind, name, handle);
        }
    }
}

impl HostRegistry for MemoryHost {
    fn is_ready(&self, kind: EntityKind) -> bool {
        !self.unready.contains(&kind)
    }

    fn lookup_template(&self, kind: EntityKind, name: &str) -> Option<Handle> {
        self.tables(kind).by_name.get(name).copied()
    }

    fn instantiate_from(&mut self, kind: EntityKind, source: Handle) -> Option<Handle> {
        self.copy_data(kind, source)
    }

    fn set_template_name(&mut self, _kind: EntityKind, template: Handle, name: &str) {
        self.template_names.insert(template, name.to_owned());
    }

    fn insert_index(&mut self, kind: EntityKind, index: TemplateIndex, name: &str, template: Handle) {
        match index {
            TemplateIndex::ByName => {
                self.tables_mut(kind).by_name.insert(name.to_owned(), template);
            }
            TemplateIndex::ByHash => {
                self.tables_mut(kind).by_hash.insert(stable_hash(name), template);
            }
            TemplateIndex::ByDataIdentity => {
                self.by_data.insert(template, template);
            }
        }
    }

    fn remove_index(&mut self, kind: EntityKind, index: TemplateIndex, name: &str, template: Handle) {
        match index {
            TemplateIndex::ByName => {
                let by_name = &mut self.tables_mut(kind).by_name;
                if by_name.get(name) == Some(&template) {
                    by_name.remove(name);
                }
            }
            TemplateIndex::ByHash => {
                let by_hash = &mut self.tables_mut(kind).by_hash;
                if by_hash.get(&stable_hash(name)) == Some(&template) {
                    by_hash.remove(&stable_hash(name));
                }
            }
            TemplateIndex::ByDataIdentity => {
                self.by_data.remove(&template);
            }
        }
    }

    fn destroy_template(&mut self, kind: EntityKind, template: Handle) {
        match kind {
            EntityKind::Item => {
                self.items.remove(&template);
            }
            EntityKind::Piece => {
                self.pieces.remove(&template);
            }
            EntityKind::Monster => {
                self.creatures.remove(&template);
            }
        }
        self.template_names.remove(&template);
        self.handles.release(template);
    }

    fn spawned_instances(&self, kind: EntityKind) -> Vec<Handle> {
        self.tables(kind).instances.iter().map(|(h, _)| *h).collect()
    }

    fn instance_template_name(&self, kind: EntityKind, instance: Handle) -> Option<String> {
        self.tables(kind)
            .instances
            .iter()
            .find(|(h, _)| *h == instance)
            .map(|(_, name)| name.clone())
    }

    fn owns_instance(&self, _kind: EntityKind, instance: Handle) -> bool {
        !self.remote.contains(&instance)
    }

    fn destroy_instance(&mut self, kind: EntityKind, instance: Handle) {
        self.tables_mut(kind).instances.retain(|(h, _)| *h != instance);
        self.items.remove(&instance);
        self.pieces.remove(&instance);
        self.creatures.remove(&instance);
        self.handles.release(instance);
    }

    fn item_data(&self, handle: Handle) -> Option<&ItemData> {
        self.items.get(&handle)
    }

    fn item_data_mut(&mut self, handle: Handle) -> Option<&mut ItemData> {
        self.items.get_mut(&handle)
    }

    fn piece_data(&self, handle: Handle) -> Option<&PieceData> {
        self.pieces.get(&handle)
    }

    fn piece_data_mut(&mut self, handle: Handle) -> Option<&mut PieceData> {
        self.pieces.get_mut(&handle)
    }

    fn creature_data(&self, handle: Handle) -> Option<&CreatureData> {
        self.creatures.get(&handle)
    }

    fn creature_data_mut(&mut self, handle: Handle) -> Option<&mut CreatureData> {
        self.creatures.get_mut(&handle)
    }

    fn recipe(&self, item: &str) -> Option<&Recipe> {
        self.recipes.get(item)
    }

    fn recipe_mut(&mut self, item: &str) -> Option<&mut Recipe> {
        self.recipes.get_mut(item)
    }

    fn insert_recipe(&mut self, item: &str, recipe: Recipe) {
        self.recipes.insert(item.to_owned(), recipe);
    }

    fn remove_recipe(&mut self, item: &str) -> Option<Recipe> {
        self.recipes.remove(item)
    }

    fn has_crafting_station(&self, name: &str) -> bool {
        self.stations.contains(name)
    }

    fn container_alive(&self, container: ContainerId) -> bool {
        self.containers.contains_key(&container)
    }

    fn container_stacks(&self, container: ContainerId) -> Option<&[ItemStack]> {
        self.containers.get(&container).map(Vec::as_slice)
    }

    fn container_stacks_mut(&mut self, container: ContainerId) -> Option<&mut Vec<ItemStack>> {
        self.containers.get_mut(&container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{LiveInstanceTracker, StackRef};

    #[test]
    fn authored_templates_land_in_every_index() {
        let mut host = MemoryHost::new();
        host.add_item("Wood", ItemData::default());
        host.add_creature("Boar", CreatureData::default());

        for index in [TemplateIndex::ByName, TemplateIndex::ByHash, TemplateIndex::ByDataIdentity] {
            assert!(host.is_indexed(EntityKind::Item, index, "Wood"));
        }
        assert!(host.is_indexed(EntityKind::Monster, TemplateIndex::ByHash, "Boar"));
        assert!(!host.is_indexed(EntityKind::Monster, TemplateIndex::ByDataIdentity, "Boar"));
    }

    #[test]
    fn spawned_instances_copy_template_data() {
        let mut host = MemoryHost::new();
        let template = host.add_creature(
            "Deer",
            CreatureData {
                health: 30.0,
                ..Default::default()
            },
        );
        let instance = host.spawn(EntityKind::Monster, "Deer").unwrap();
        host.creature_data_mut(template).unwrap().health = 99.0;

        assert_eq!(host.creature_data(instance).unwrap().health, 30.0);
        assert_eq!(
            host.instance_template_name(EntityKind::Monster, instance).as_deref(),
            Some("Deer")
        );
    }

    #[test]
    fn destroyed_container_is_not_alive() {
        let mut host = MemoryHost::new();
        host.add_item("Wood", ItemData::default());
        let chest = host.create_container();
        host.add_stack(chest, "Wood", 10).unwrap();
        assert!(host.container_alive(chest));

        host.destroy_container(chest);
        assert!(!host.container_alive(chest));
        assert!(host.stacks(chest).is_empty());
    }

    #[test]
    fn tracker_enumerates_live_containers_only() {
        let mut host = MemoryHost::new();
        host.add_item("Wood", ItemData::default());
        let chest = host.create_container();
        let cart = host.create_container();
        host.add_stack(chest, "Wood", 10).unwrap();
        host.add_stack(chest, "Wood", 5).unwrap();
        host.add_stack(cart, "Wood", 1).unwrap();

        let mut tracker = LiveInstanceTracker::new();
        tracker.register_container(chest);
        tracker.register_container(cart);
        assert_eq!(tracker.all_tracked_stacks(&host).len(), 3);

        host.destroy_container(cart);
        let stacks = tracker.all_tracked_stacks(&host);
        assert_eq!(
            stacks,
            vec![
                StackRef { container: chest, slot: 0 },
                StackRef { container: chest, slot: 1 },
            ]
        );
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn unknown_template_cannot_spawn() {
        let mut host = MemoryHost::new();
        assert_eq!(host.spawn(EntityKind::Piece, "Nothing"), None);
        assert_eq!(host.add_stack(ContainerId(Handle::new(0, 0)), "Nothing", 1), None);
    }
}
