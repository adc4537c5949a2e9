//! The boundary between the engine and the simulation that owns the data.
//!
//! The engine never holds host objects directly. It names them through
//! [`Handle`]s and reaches their state through [`HostRegistry`], which the
//! host implements over its own registries. Every method is called from the
//! single thread that owns those registries.

use patchwright_core::EntityKind;
use serde::{Deserialize, Serialize};

use crate::handle::Handle;
use crate::model::{CreatureData, ItemData, ItemStack, PieceData, Recipe};

/// Identifies a container-like object whose item stacks the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub Handle);

/// A lookup structure through which the host resolves templates.
///
/// Clone templates must be inserted into each index the host reports for
/// their kind so they are indistinguishable from authored templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TemplateIndex {
    /// Name to template.
    ByName,
    /// [`stable_hash`](patchwright_core::hash::stable_hash) of the name to
    /// template.
    ByHash,
    /// Shared item data to the template that owns it.
    ByDataIdentity,
}

const ITEM_INDICES: &[TemplateIndex] = &[
    TemplateIndex::ByName,
    TemplateIndex::ByHash,
    TemplateIndex::ByDataIdentity,
];
const DEFAULT_INDICES: &[TemplateIndex] = &[TemplateIndex::ByName, TemplateIndex::ByHash];

/// Everything the engine needs from the host simulation.
pub trait HostRegistry {
    /// Whether the registries for `kind` are initialized. Passes for a kind
    /// whose registry is not ready are skipped.
    fn is_ready(&self, kind: EntityKind) -> bool;

    // -- templates ----------------------------------------------------------

    fn lookup_template(&self, kind: EntityKind, name: &str) -> Option<Handle>;

    /// Duplicate `source`, including its data, into a new detached template.
    fn instantiate_from(&mut self, kind: EntityKind, source: Handle) -> Option<Handle>;

    fn set_template_name(&mut self, kind: EntityKind, template: Handle, name: &str);

    /// Indices a template of `kind` must appear in, in insertion order.
    fn template_indices(&self, kind: EntityKind) -> &'static [TemplateIndex] {
        match kind {
            EntityKind::Item => ITEM_INDICES,
            EntityKind::Piece | EntityKind::Monster => DEFAULT_INDICES,
        }
    }

    fn insert_index(&mut self, kind: EntityKind, index: TemplateIndex, name: &str, template: Handle);

    fn remove_index(&mut self, kind: EntityKind, index: TemplateIndex, name: &str, template: Handle);

    /// Free a detached template. It has already been removed from every index.
    fn destroy_template(&mut self, kind: EntityKind, template: Handle);

    // -- spawned instances --------------------------------------------------

    fn spawned_instances(&self, kind: EntityKind) -> Vec<Handle>;

    /// Name of the template `instance` was spawned from.
    fn instance_template_name(&self, kind: EntityKind, instance: Handle) -> Option<String>;

    /// Whether this process has authority to destroy `instance`.
    fn owns_instance(&self, kind: EntityKind, instance: Handle) -> bool;

    fn destroy_instance(&mut self, kind: EntityKind, instance: Handle);

    // -- live data ----------------------------------------------------------
    //
    // Templates and spawned instances are both addressed by handle; each
    // spawned instance carries its own copy of the data.

    fn item_data(&self, handle: Handle) -> Option<&ItemData>;
    fn item_data_mut(&mut self, handle: Handle) -> Option<&mut ItemData>;
    fn piece_data(&self, handle: Handle) -> Option<&PieceData>;
    fn piece_data_mut(&mut self, handle: Handle) -> Option<&mut PieceData>;
    fn creature_data(&self, handle: Handle) -> Option<&CreatureData>;
    fn creature_data_mut(&mut self, handle: Handle) -> Option<&mut CreatureData>;

    // -- recipes ------------------------------------------------------------

    /// Recipe crafting the item template `item`.
    fn recipe(&self, item: &str) -> Option<&Recipe>;
    fn recipe_mut(&mut self, item: &str) -> Option<&mut Recipe>;
    fn insert_recipe(&mut self, item: &str, recipe: Recipe);
    fn remove_recipe(&mut self, item: &str) -> Option<Recipe>;

    fn has_crafting_station(&self, name: &str) -> bool;

    // -- containers ---------------------------------------------------------

    fn container_alive(&self, container: ContainerId) -> bool;
    fn container_stacks(&self, container: ContainerId) -> Option<&[ItemStack]>;
    fn container_stacks_mut(&mut self, container: ContainerId) -> Option<&mut Vec<ItemStack>>;
}
