//! Applying descriptors to live host data.
//!
//! Every present field overwrites its target; every absent field is left
//! alone. Names inside a descriptor (requirement resources, fuel items,
//! conversion inputs and outputs, crafting stations) are resolved against
//! the host before anything is written. A name that does not resolve skips
//! only the sub-field or list entry that carries it, logs a warning, and is
//! counted in the returned skip total. Nothing here ever fails a pass.

use std::collections::BTreeMap;

use patchwright_core::codec::Descriptor;
use patchwright_core::descriptor::{
    ItemDescriptor, MonsterDescriptor, PieceDescriptor, Requirement,
};
use patchwright_core::EntityKind;
use tracing::{debug, warn};

use crate::handle::Handle;
use crate::host::HostRegistry;
use crate::model::{
    CreatureData, FermenterConversion, ItemData, ItemStack, PieceData, Recipe, SmelterConversion,
};
use crate::tracker::LiveInstanceTracker;

// ---------------------------------------------------------------------------
// Apply trait
// ---------------------------------------------------------------------------

/// A descriptor kind the engine knows how to apply.
pub trait Apply: Descriptor {
    /// Patch the template or spawned instance behind `target`, which is
    /// named (or was spawned from a template named) `name`.
    ///
    /// Returns how many sub-entries were skipped because a name inside the
    /// descriptor did not resolve.
    fn apply_to<H: HostRegistry + ?Sized>(&self, host: &mut H, name: &str, target: Handle) -> usize;

    /// Patch tracked container stacks whose drop template has an entry in
    /// `entries`. Returns how many stacks were patched.
    fn apply_to_stacks<H: HostRegistry + ?Sized>(
        _entries: &BTreeMap<String, Self>,
        _host: &mut H,
        _tracker: &mut LiveInstanceTracker,
    ) -> usize {
        0
    }
}

impl Apply for ItemDescriptor {
    fn apply_to<H: HostRegistry + ?Sized>(&self, host: &mut H, name: &str, target: Handle) -> usize {
        apply_item(host, name, target, self)
    }

    fn apply_to_stacks<H: HostRegistry + ?Sized>(
        entries: &BTreeMap<String, Self>,
        host: &mut H,
        tracker: &mut LiveInstanceTracker,
    ) -> usize {
        let mut patched = 0;
        tracker.for_each_stack_mut(host, |stack| {
            if let Some(d) = stack_entry(entries, stack) {
                apply_item_shared(d, &mut stack.data);
                patched += 1;
            }
        });
        patched
    }
}

impl Apply for PieceDescriptor {
    fn apply_to<H: HostRegistry + ?Sized>(&self, host: &mut H, name: &str, target: Handle) -> usize {
        apply_piece(host, name, target, self)
    }
}

impl Apply for MonsterDescriptor {
    fn apply_to<H: HostRegistry + ?Sized>(&self, host: &mut H, name: &str, target: Handle) -> usize {
        match host.creature_data_mut(target) {
            Some(data) => {
                apply_creature(self, data);
                debug!(template = %name, "patched creature");
            }
            None => debug!(template = %name, handle = %target, "no creature data behind handle"),
        }
        0
    }
}

fn stack_entry<'a>(entries: &'a BTreeMap<String, ItemDescriptor>, stack: &ItemStack) -> Option<&'a ItemDescriptor> {
    entries.get(stack.drop_template.as_deref()?)
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

fn resolve_item_name<H: HostRegistry + ?Sized>(
    host: &H,
    owner: &str,
    field: &'static str,
    item: &str,
    skipped: &mut usize,
) -> Option<String> {
    if host.lookup_template(EntityKind::Item, item).is_some() {
        Some(item.to_owned())
    } else {
        warn!(template = %owner, field, item = %item, "unknown item template; skipped");
        *skipped += 1;
        None
    }
}

fn resolve_requirements<H: HostRegistry + ?Sized>(
    host: &H,
    owner: &str,
    reqs: &[Requirement],
    skipped: &mut usize,
) -> Vec<Requirement> {
    reqs.iter()
        .filter(|req| {
            resolve_item_name(host, owner, "requirement", &req.resource, &mut *skipped).is_some()
        })
        .cloned()
        .collect()
}

fn resolve_station<H: HostRegistry + ?Sized>(
    host: &H,
    owner: &str,
    station: &str,
    skipped: &mut usize,
) -> Option<String> {
    if host.has_crafting_station(station) {
        Some(station.to_owned())
    } else {
        warn!(template = %owner, station = %station, "unknown crafting station; skipped");
        *skipped += 1;
        None
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Apply the fields every copy of an item carries. Recipes are untouched.
pub fn apply_item_shared(d: &ItemDescriptor, data: &mut ItemData) {
    if !d.name.is_empty() {
        data.name.clone_from(&d.name);
    }
    if !d.description.is_empty() {
        data.description.clone_from(&d.description);
    }
    if let Some(weight) = d.weight {
        data.weight = weight as f32;
    }
    if let Some(durability) = d.max_durability {
        data.max_durability = durability as f32;
    }
    if let Some(damage) = &d.damage {
        data.damages = damage.map(|v| v as f32);
    }
    if let Some(damage) = &d.damage_per_level {
        data.damages_per_level = damage.map(|v| v as f32);
    }
}

/// Apply an item descriptor, including its recipe, to `target`.
///
/// A non-empty craft list replaces the recipe's resources (creating the
/// recipe if needed) along with its station and repair level. Without a
/// craft list the recipe is left alone, unless the descriptor was captured
/// from an item with no recipe, in which case it is removed.
pub fn apply_item<H: HostRegistry + ?Sized>(
    host: &mut H,
    name: &str,
    target: Handle,
    d: &ItemDescriptor,
) -> usize {
    let mut skipped = 0;
    let view: &H = host;

    let resources = d
        .craft
        .as_deref()
        .filter(|craft| !craft.is_empty())
        .map(|craft| resolve_requirements(view, name, craft, &mut skipped));
    let station = if resources.is_some() && d.has_crafting_station && !d.crafting_station.is_empty() {
        resolve_station(view, name, &d.crafting_station, &mut skipped)
    } else {
        None
    };

    match host.item_data_mut(target) {
        Some(data) => apply_item_shared(d, data),
        None => {
            debug!(template = %name, handle = %target, "no item data behind handle");
            return skipped;
        }
    }

    match resources {
        Some(resources) => {
            if host.recipe(name).is_none() {
                debug!(template = %name, "creating recipe");
                host.insert_recipe(name, Recipe::for_item(name));
            }
            if let Some(recipe) = host.recipe_mut(name) {
                recipe.resources = resources;
                if !d.has_crafting_station {
                    recipe.crafting_station = None;
                } else if station.is_some() {
                    recipe.crafting_station = station;
                }
                if let Some(level) = d.repair_station_level {
                    recipe.min_station_level = level;
                }
            }
        }
        None if !d.has_recipe => {
            if host.remove_recipe(name).is_some() {
                debug!(template = %name, "removed recipe");
            }
        }
        None => {}
    }

    debug!(template = %name, skipped, "patched item");
    skipped
}

// ---------------------------------------------------------------------------
// Pieces
// ---------------------------------------------------------------------------

/// Apply a piece descriptor to `target`. Sub-records only patch components
/// the piece already has.
pub fn apply_piece<H: HostRegistry + ?Sized>(
    host: &mut H,
    name: &str,
    target: Handle,
    d: &PieceDescriptor,
) -> usize {
    let mut skipped = 0;

    // Resolve every referenced name up front so the mutable borrow below
    // does not overlap any registry lookup.
    let view: &H = host;
    let station = (!d.crafting_station.is_empty())
        .then(|| resolve_station(view, name, &d.crafting_station, &mut skipped))
        .flatten();
    let resources = d
        .build
        .as_deref()
        .map(|build| resolve_requirements(view, name, build, &mut skipped));
    let fireplace_fuel = d
        .fireplace
        .as_ref()
        .filter(|f| !f.fuel_item_name.is_empty())
        .and_then(|f| resolve_item_name(view, name, "fireplace fuel", &f.fuel_item_name, &mut skipped));
    let smelter_fuel = d
        .smelter
        .as_ref()
        .filter(|s| !s.fuel_item_name.is_empty())
        .and_then(|s| resolve_item_name(view, name, "smelter fuel", &s.fuel_item_name, &mut skipped));
    let fermenter_conversions = d
        .fermenter
        .as_ref()
        .and_then(|f| f.conversions.as_deref())
        .map(|conversions| {
            conversions
                .iter()
                .filter_map(|c| {
                    let from = resolve_item_name(view, name, "conversion input", &c.from, &mut skipped)?;
                    let to = resolve_item_name(view, name, "conversion output", &c.to, &mut skipped)?;
                    Some(FermenterConversion {
                        from,
                        to,
                        produced: c.amount,
                    })
                })
                .collect::<Vec<_>>()
        });
    let smelter_conversions = d
        .smelter
        .as_ref()
        .and_then(|s| s.conversions.as_deref())
        .map(|conversions| {
            conversions
                .iter()
                .filter_map(|c| {
                    let from = resolve_item_name(view, name, "conversion input", &c.from, &mut skipped)?;
                    let to = resolve_item_name(view, name, "conversion output", &c.to, &mut skipped)?;
                    Some(SmelterConversion { from, to })
                })
                .collect::<Vec<_>>()
        });

    let Some(data) = host.piece_data_mut(target) else {
        debug!(template = %name, handle = %target, "no piece data behind handle");
        return skipped;
    };

    patch_piece(
        d,
        data,
        ResolvedPieceNames {
            station,
            resources,
            fireplace_fuel,
            smelter_fuel,
            fermenter_conversions,
            smelter_conversions,
        },
    );

    debug!(template = %name, skipped, "patched piece");
    skipped
}

struct ResolvedPieceNames {
    station: Option<String>,
    resources: Option<Vec<Requirement>>,
    fireplace_fuel: Option<String>,
    smelter_fuel: Option<String>,
    fermenter_conversions: Option<Vec<FermenterConversion>>,
    smelter_conversions: Option<Vec<SmelterConversion>>,
}

fn patch_piece(d: &PieceDescriptor, data: &mut PieceData, resolved: ResolvedPieceNames) {
    if !d.name.is_empty() {
        data.name.clone_from(&d.name);
    }
    if !d.description.is_empty() {
        data.description.clone_from(&d.description);
    }
    if let Some(station) = resolved.station {
        data.crafting_station = Some(station);
    }

    if let Some(wear) = &mut data.wear {
        if let Some(health) = d.health {
            wear.health = health as f32;
        }
        if let Some(mods) = d.damage_modifiers {
            wear.damage_modifiers = mods;
        }
    }

    if let (Some(container), Some(spec)) = (&mut data.container, &d.container) {
        container.width = spec.width;
        container.height = spec.height;
    }

    if let (Some(fireplace), Some(spec)) = (&mut data.fireplace, &d.fireplace) {
        fireplace.start_fuel = spec.start_fuel as f32;
        fireplace.max_fuel = spec.max_fuel as f32;
        fireplace.secs_per_fuel = spec.seconds_per_fuel as f32;
        if resolved.fireplace_fuel.is_some() {
            fireplace.fuel_item = resolved.fireplace_fuel;
        }
    }

    if let (Some(fermenter), Some(spec)) = (&mut data.fermenter, &d.fermenter) {
        fermenter.duration = spec.duration_seconds as f32;
        if let Some(conversions) = resolved.fermenter_conversions {
            fermenter.conversions = conversions;
        }
    }

    if let (Some(smelter), Some(spec)) = (&mut data.smelter, &d.smelter) {
        if resolved.smelter_fuel.is_some() {
            smelter.fuel_item = resolved.smelter_fuel;
        }
        smelter.max_ore = spec.max_ore;
        smelter.max_fuel = spec.max_fuel;
        smelter.fuel_per_product = spec.fuel_per_product;
        smelter.secs_per_product = spec.seconds_per_product as f32;
        if let Some(conversions) = resolved.smelter_conversions {
            smelter.conversions = conversions;
        }
    }

    if let Some(resources) = resolved.resources {
        data.resources = resources;
    }
}

// ---------------------------------------------------------------------------
// Creatures
// ---------------------------------------------------------------------------

/// Apply a creature descriptor. The damage multiplier is not stored on the
/// creature; hosts read it from the store when an attack starts.
pub fn apply_creature(d: &MonsterDescriptor, data: &mut CreatureData) {
    if !d.name.is_empty() {
        data.name.clone_from(&d.name);
    }
    if let Some(health) = d.health {
        data.health = health as f32;
    }
    if let Some(speed) = d.walk_speed {
        data.walk_speed = speed;
    }
    if let Some(speed) = d.swim_speed {
        data.swim_speed = speed;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
