//! Live data the host exposes for the engine to patch.
//!
//! These are the host-side shapes descriptors are applied to and captured
//! from. Numeric fields are `f32` where the host stores floats; descriptors
//! carry whole numbers that are widened on apply and truncated on capture.

use patchwright_core::descriptor::{DamageModifiers, DamageTypes, Requirement};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Shared definition of an item kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub name: String,
    pub description: String,
    pub weight: f32,
    pub max_durability: f32,
    pub damages: DamageTypes<f32>,
    pub damages_per_level: DamageTypes<f32>,
}

/// How an item is crafted.
///
/// The host keeps recipes in a book keyed by the crafted item's template
/// name. Resource names in `resources` always refer to known item templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub resources: Vec<Requirement>,
    pub crafting_station: Option<String>,
    pub min_station_level: i32,
}

impl Recipe {
    /// Name given to a recipe the engine creates for `item`.
    pub fn default_name(item: &str) -> String {
        format!("{item}_Recipe")
    }

    /// An empty recipe for `item`.
    pub fn for_item(item: &str) -> Self {
        Self {
            name: Self::default_name(item),
            ..Default::default()
        }
    }
}

/// An item stack sitting inside a container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Template the stack drops as, if it has one.
    pub drop_template: Option<String>,
    /// The stack's own copy of the item definition.
    pub data: ItemData,
    pub stack: i32,
}

// ---------------------------------------------------------------------------
// Pieces
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WearData {
    pub health: f32,
    pub damage_modifiers: DamageModifiers,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerData {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FireplaceData {
    pub start_fuel: f32,
    pub max_fuel: f32,
    pub secs_per_fuel: f32,
    pub fuel_item: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FermenterConversion {
    pub from: String,
    pub to: String,
    pub produced: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FermenterData {
    pub duration: f32,
    pub conversions: Vec<FermenterConversion>,
}

/// Smelters always produce one output per input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmelterConversion {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmelterData {
    pub fuel_item: Option<String>,
    pub max_ore: i32,
    pub max_fuel: i32,
    pub fuel_per_product: i32,
    pub secs_per_product: f32,
    pub conversions: Vec<SmelterConversion>,
}

/// A buildable piece and the optional components it carries.
///
/// Applying a descriptor only ever patches components that are present; it
/// never adds one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PieceData {
    pub name: String,
    pub description: String,
    pub crafting_station: Option<String>,
    pub resources: Vec<Requirement>,
    pub wear: Option<WearData>,
    pub container: Option<ContainerData>,
    pub fireplace: Option<FireplaceData>,
    pub fermenter: Option<FermenterData>,
    pub smelter: Option<SmelterData>,
}

// ---------------------------------------------------------------------------
// Creatures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatureData {
    pub name: String,
    pub health: f32,
    pub walk_speed: f32,
    pub swim_speed: f32,
}
