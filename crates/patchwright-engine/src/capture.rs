//! Building descriptors from live template state.
//!
//! Capture is the inverse of apply: it reads a template through the host and
//! returns a fully populated descriptor. Float fields are truncated toward
//! zero. The result is suitable for writing out as a starting-point config
//! or for diffing against an authored override.

use patchwright_core::descriptor::{
    ContainerSpec, Conversion, FermenterSpec, FireplaceSpec, ItemDescriptor, MonsterDescriptor,
    PieceDescriptor, SmelterSpec,
};
use patchwright_core::EntityKind;

use crate::host::HostRegistry;

/// Capture the item template `name` and its recipe.
///
/// With no recipe the result has `has_recipe == false`, so applying it
/// removes any recipe the target has. A recipe without a station gives
/// `has_crafting_station == false`.
pub fn capture_item<H: HostRegistry + ?Sized>(host: &H, name: &str) -> Option<ItemDescriptor> {
    let template = host.lookup_template(EntityKind::Item, name)?;
    let data = host.item_data(template)?;

    let mut d = ItemDescriptor {
        name: data.name.clone(),
        description: data.description.clone(),
        weight: Some(data.weight as i32),
        max_durability: Some(data.max_durability as i32),
        damage: Some(data.damages.map(|v| v as i32)),
        damage_per_level: Some(data.damages_per_level.map(|v| v as i32)),
        ..Default::default()
    };

    match host.recipe(name) {
        None => d.has_recipe = false,
        Some(recipe) => {
            d.craft = Some(recipe.resources.clone());
            d.crafting_station = recipe.crafting_station.clone().unwrap_or_default();
            d.has_crafting_station = recipe.crafting_station.is_some();
            d.repair_station_level = Some(recipe.min_station_level);
        }
    }
    Some(d)
}

/// Capture the piece template `name`. Only components the piece has are
/// filled in.
pub fn capture_piece<H: HostRegistry + ?Sized>(host: &H, name: &str) -> Option<PieceDescriptor> {
    let template = host.lookup_template(EntityKind::Piece, name)?;
    let data = host.piece_data(template)?;

    let mut d = PieceDescriptor {
        name: data.name.clone(),
        description: data.description.clone(),
        crafting_station: data.crafting_station.clone().unwrap_or_default(),
        build: (!data.resources.is_empty()).then(|| data.resources.clone()),
        ..Default::default()
    };

    if let Some(wear) = &data.wear {
        d.health = Some(wear.health as i32);
        d.damage_modifiers = Some(wear.damage_modifiers);
    }
    d.container = data.container.map(|c| ContainerSpec {
        width: c.width,
        height: c.height,
    });
    d.fireplace = data.fireplace.as_ref().map(|f| FireplaceSpec {
        start_fuel: f.start_fuel as i32,
        max_fuel: f.max_fuel as i32,
        seconds_per_fuel: f.secs_per_fuel as i32,
        fuel_item_name: f.fuel_item.clone().unwrap_or_default(),
    });
    d.fermenter = data.fermenter.as_ref().map(|f| FermenterSpec {
        duration_seconds: f.duration as i32,
        conversions: Some(
            f.conversions
                .iter()
                .map(|c| Conversion {
                    from: c.from.clone(),
                    to: c.to.clone(),
                    amount: c.produced,
                })
                .collect(),
        ),
    });
    d.smelter = data.smelter.as_ref().map(|s| SmelterSpec {
        fuel_item_name: s.fuel_item.clone().unwrap_or_default(),
        max_ore: s.max_ore,
        max_fuel: s.max_fuel,
        fuel_per_product: s.fuel_per_product,
        seconds_per_product: s.secs_per_product as i32,
        conversions: Some(
            s.conversions
                .iter()
                .map(|c| Conversion {
                    from: c.from.clone(),
                    to: c.to.clone(),
                    amount: 1,
                })
                .collect(),
        ),
    });
    Some(d)
}

/// Capture the creature template `name`. The damage multiplier lives in the
/// store, not on the creature, so it is never captured.
pub fn capture_creature<H: HostRegistry + ?Sized>(host: &H, name: &str) -> Option<MonsterDescriptor> {
    let template = host.lookup_template(EntityKind::Monster, name)?;
    let data = host.creature_data(template)?;
    Some(MonsterDescriptor {
        name: data.name.clone(),
        health: Some(data.health as i32),
        walk_speed: Some(data.walk_speed),
        swim_speed: Some(data.swim_speed),
        ..Default::default()
    })
}
