//! Bitmask codec for override descriptors.
//!
//! Every record starts with an `i32` bitmask holding one bit per optional
//! field. Fields follow in a fixed order, each written only when its bit is
//! set. Lists are written as an `i32` count followed by their elements;
//! damage vectors as ten `i32` components. Sub-records whose own inner field
//! may be missing (fermenter/smelter conversions, smelter fuel item) carry an
//! explicit `bool` presence flag ahead of that inner payload.
//!
//! Bits this version does not know about are ignored on decode, so payloads
//! authored by a newer configuration tool still load. The layout per kind:
//!
//! | Kind    | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 |
//! |---------|---|---|---|---|---|---|---|---|---|---|
//! | Item    | Name | Description | CraftingStation | Weight | MaxDurability | RepairStationLevel | Craft | Damage | DamagePerLevel | CloneSource |
//! | Monster | Name | Health | WalkSpeed | SwimSpeed | DamageMultiplier | CloneSource | | | | |
//! | Piece   | Health | DamageModifiers | Build | Name | Description | Container | Fireplace | Fermenter | Smelter | CraftingStation |

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::buffer::{PackageReader, PackageWriter};
use crate::descriptor::{
    ContainerSpec, Conversion, DamageModifier, DamageModifiers, DamageTypes, FermenterSpec,
    FireplaceSpec, ItemDescriptor, MonsterDescriptor, PieceDescriptor, Requirement, SmelterSpec,
};
use crate::{CodecError, EntityKind};

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

bitflags! {
    /// Presence bits for [`ItemDescriptor`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ItemFlags: i32 {
        const NAME = 1 << 0;
        const DESCRIPTION = 1 << 1;
        const CRAFTING_STATION = 1 << 2;
        const WEIGHT = 1 << 3;
        const MAX_DURABILITY = 1 << 4;
        const REPAIR_STATION_LEVEL = 1 << 5;
        const CRAFT = 1 << 6;
        const DAMAGE = 1 << 7;
        const DAMAGE_PER_LEVEL = 1 << 8;
        const CLONE_SOURCE = 1 << 9;
    }

    /// Presence bits for [`PieceDescriptor`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PieceFlags: i32 {
        const HEALTH = 1 << 0;
        const DAMAGE_MODIFIERS = 1 << 1;
        const BUILD = 1 << 2;
        const NAME = 1 << 3;
        const DESCRIPTION = 1 << 4;
        const CONTAINER = 1 << 5;
        const FIREPLACE = 1 << 6;
        const FERMENTER = 1 << 7;
        const SMELTER = 1 << 8;
        const CRAFTING_STATION = 1 << 9;
    }

    /// Presence bits for [`MonsterDescriptor`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MonsterFlags: i32 {
        const NAME = 1 << 0;
        const HEALTH = 1 << 1;
        const WALK_SPEED = 1 << 2;
        const SWIM_SPEED = 1 << 3;
        const DAMAGE_MULTIPLIER = 1 << 4;
        const CLONE_SOURCE = 1 << 5;
    }
}

// Smallest encodings, used to bound list allocations on decode.
const MIN_STRING_SIZE: usize = 1;
const MIN_CONVERSION_SIZE: usize = 2 * MIN_STRING_SIZE + 4;

// ---------------------------------------------------------------------------
// Descriptor trait
// ---------------------------------------------------------------------------

/// A record kind that can be encoded into and decoded from a package.
pub trait Descriptor: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    /// Which template family this descriptor targets.
    const KIND: EntityKind;

    /// Name of the template this entry should be cloned from, if any.
    fn clone_source(&self) -> Option<&str>;

    /// Append this descriptor to `w`.
    fn encode_into(&self, w: &mut PackageWriter);

    /// Read one descriptor from `r`.
    fn decode_from(r: &mut PackageReader<'_>) -> Result<Self, CodecError>;
}

/// Encode one descriptor into a fresh buffer.
pub fn encode<D: Descriptor>(descriptor: &D) -> Vec<u8> {
    let mut w = PackageWriter::new();
    descriptor.encode_into(&mut w);
    w.into_bytes()
}

/// Decode one descriptor from the start of `bytes`.
///
/// Trailing bytes are ignored: a newer writer may have appended payload for
/// bits this version does not recognise.
pub fn decode<D: Descriptor>(bytes: &[u8]) -> Result<D, CodecError> {
    D::decode_from(&mut PackageReader::new(bytes))
}

/// Encode a whole override mapping: an `i32` entry count, then each key
/// followed by its descriptor, in map order.
pub fn encode_snapshot<D: Descriptor>(entries: &BTreeMap<String, D>) -> Vec<u8> {
    let mut w = PackageWriter::with_capacity(4 + entries.len() * 16);
    w.write_i32(entries.len() as i32);
    for (name, descriptor) in entries {
        w.write_str(name);
        descriptor.encode_into(&mut w);
    }
    w.into_bytes()
}

/// Decode a whole override mapping written by [`encode_snapshot`].
///
/// Fails atomically: a truncated or corrupt payload yields an error and no
/// partial mapping. Duplicate keys resolve last-writer-wins.
pub fn decode_snapshot<D: Descriptor>(bytes: &[u8]) -> Result<BTreeMap<String, D>, CodecError> {
    let mut r = PackageReader::new(bytes);
    // key (>= 1 byte) + bitmask (4 bytes)
    let count = r.read_count(MIN_STRING_SIZE + 4)?;
    let mut entries = BTreeMap::new();
    for _ in 0..count {
        let name = r.read_string()?;
        let descriptor = D::decode_from(&mut r)?;
        entries.insert(name, descriptor);
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

fn write_requirements(w: &mut PackageWriter, reqs: &[Requirement]) {
    w.write_i32(reqs.len() as i32);
    for req in reqs {
        w.write_str(&req.to_string());
    }
}

fn read_requirements(r: &mut PackageReader<'_>) -> Result<Vec<Requirement>, CodecError> {
    let count = r.read_count(MIN_STRING_SIZE)?;
    let mut reqs = Vec::with_capacity(count);
    for _ in 0..count {
        reqs.push(Requirement::from_wire(&r.read_string()?)?);
    }
    Ok(reqs)
}

fn write_damage(w: &mut PackageWriter, damage: &DamageTypes) {
    for v in damage.to_array() {
        w.write_i32(v);
    }
}

fn read_damage(r: &mut PackageReader<'_>) -> Result<DamageTypes, CodecError> {
    let mut v = [0i32; 10];
    for slot in &mut v {
        *slot = r.read_i32()?;
    }
    Ok(DamageTypes::from_array(v))
}

fn write_modifiers(w: &mut PackageWriter, mods: &DamageModifiers) {
    for m in mods.to_array() {
        w.write_i32(m.to_wire());
    }
}

fn read_modifiers(r: &mut PackageReader<'_>) -> Result<DamageModifiers, CodecError> {
    let mut v = [DamageModifier::Normal; 10];
    for slot in &mut v {
        *slot = DamageModifier::from_wire(r.read_i32()?)?;
    }
    Ok(DamageModifiers::from_array(v))
}

fn write_conversions(w: &mut PackageWriter, conversions: Option<&Vec<Conversion>>) {
    w.write_bool(conversions.is_some());
    if let Some(conversions) = conversions {
        w.write_i32(conversions.len() as i32);
        for c in conversions {
            w.write_str(&c.from);
            w.write_str(&c.to);
            w.write_i32(c.amount);
        }
    }
}

fn read_conversions(r: &mut PackageReader<'_>) -> Result<Option<Vec<Conversion>>, CodecError> {
    if !r.read_bool()? {
        return Ok(None);
    }
    let count = r.read_count(MIN_CONVERSION_SIZE)?;
    let mut conversions = Vec::with_capacity(count);
    for _ in 0..count {
        conversions.push(Conversion {
            from: r.read_string()?,
            to: r.read_string()?,
            amount: r.read_i32()?,
        });
    }
    Ok(Some(conversions))
}

// ---------------------------------------------------------------------------
// ItemDescriptor
// ---------------------------------------------------------------------------

impl ItemDescriptor {
    /// Presence bits this descriptor would be written with.
    pub fn flags(&self) -> ItemFlags {
        let mut flags = ItemFlags::empty();
        flags.set(ItemFlags::NAME, !self.name.is_empty());
        flags.set(ItemFlags::DESCRIPTION, !self.description.is_empty());
        flags.set(ItemFlags::CRAFTING_STATION, !self.crafting_station.is_empty());
        flags.set(ItemFlags::WEIGHT, self.weight.is_some());
        flags.set(ItemFlags::MAX_DURABILITY, self.max_durability.is_some());
        flags.set(ItemFlags::REPAIR_STATION_LEVEL, self.repair_station_level.is_some());
        flags.set(ItemFlags::CRAFT, self.craft.is_some());
        flags.set(ItemFlags::DAMAGE, self.damage.is_some());
        flags.set(ItemFlags::DAMAGE_PER_LEVEL, self.damage_per_level.is_some());
        flags.set(ItemFlags::CLONE_SOURCE, !self.clone_source.is_empty());
        flags
    }
}

impl Descriptor for ItemDescriptor {
    const KIND: EntityKind = EntityKind::Item;

    fn clone_source(&self) -> Option<&str> {
        non_empty(&self.clone_source)
    }

    fn encode_into(&self, w: &mut PackageWriter) {
        let flags = self.flags();
        w.write_i32(flags.bits());

        if flags.contains(ItemFlags::NAME) {
            w.write_str(&self.name);
        }
        if flags.contains(ItemFlags::DESCRIPTION) {
            w.write_str(&self.description);
        }
        if flags.contains(ItemFlags::CRAFTING_STATION) {
            w.write_str(&self.crafting_station);
        }
        if let Some(weight) = self.weight {
            w.write_i32(weight);
        }
        if let Some(durability) = self.max_durability {
            w.write_i32(durability);
        }
        if let Some(level) = self.repair_station_level {
            w.write_i32(level);
        }
        if flags.contains(ItemFlags::CLONE_SOURCE) {
            w.write_str(&self.clone_source);
        }
        if let Some(craft) = &self.craft {
            write_requirements(w, craft);
        }
        if let Some(damage) = &self.damage {
            write_damage(w, damage);
        }
        if let Some(damage) = &self.damage_per_level {
            write_damage(w, damage);
        }
    }

    fn decode_from(r: &mut PackageReader<'_>) -> Result<Self, CodecError> {
        let flags = ItemFlags::from_bits_truncate(r.read_i32()?);
        let mut d = ItemDescriptor::default();

        if flags.contains(ItemFlags::NAME) {
            d.name = r.read_string()?;
        }
        if flags.contains(ItemFlags::DESCRIPTION) {
            d.description = r.read_string()?;
        }
        if flags.contains(ItemFlags::CRAFTING_STATION) {
            d.crafting_station = r.read_string()?;
        }
        if flags.contains(ItemFlags::WEIGHT) {
            d.weight = Some(r.read_i32()?);
        }
        if flags.contains(ItemFlags::MAX_DURABILITY) {
            d.max_durability = Some(r.read_i32()?);
        }
        if flags.contains(ItemFlags::REPAIR_STATION_LEVEL) {
            d.repair_station_level = Some(r.read_i32()?);
        }
        if flags.contains(ItemFlags::CLONE_SOURCE) {
            d.clone_source = r.read_string()?;
        }
        if flags.contains(ItemFlags::CRAFT) {
            d.craft = Some(read_requirements(r)?);
        }
        if flags.contains(ItemFlags::DAMAGE) {
            d.damage = Some(read_damage(r)?);
        }
        if flags.contains(ItemFlags::DAMAGE_PER_LEVEL) {
            d.damage_per_level = Some(read_damage(r)?);
        }
        Ok(d)
    }
}

// ---------------------------------------------------------------------------
// PieceDescriptor
// ---------------------------------------------------------------------------

impl PieceDescriptor {
    /// Presence bits this descriptor would be written with.
    pub fn flags(&self) -> PieceFlags {
        let mut flags = PieceFlags::empty();
        flags.set(PieceFlags::HEALTH, self.health.is_some());
        flags.set(PieceFlags::DAMAGE_MODIFIERS, self.damage_modifiers.is_some());
        flags.set(PieceFlags::BUILD, self.build.is_some());
        flags.set(PieceFlags::NAME, !self.name.is_empty());
        flags.set(PieceFlags::DESCRIPTION, !self.description.is_empty());
        flags.set(PieceFlags::CONTAINER, self.container.is_some());
        flags.set(PieceFlags::FIREPLACE, self.fireplace.is_some());
        flags.set(PieceFlags::FERMENTER, self.fermenter.is_some());
        flags.set(PieceFlags::SMELTER, self.smelter.is_some());
        flags.set(PieceFlags::CRAFTING_STATION, !self.crafting_station.is_empty());
        flags
    }
}

impl Descriptor for PieceDescriptor {
    const KIND: EntityKind = EntityKind::Piece;

    fn clone_source(&self) -> Option<&str> {
        None
    }

    fn encode_into(&self, w: &mut PackageWriter) {
        let flags = self.flags();
        w.write_i32(flags.bits());

        if let Some(health) = self.health {
            w.write_i32(health);
        }
        if let Some(mods) = &self.damage_modifiers {
            write_modifiers(w, mods);
        }
        if let Some(build) = &self.build {
            write_requirements(w, build);
        }
        if flags.contains(PieceFlags::NAME) {
            w.write_str(&self.name);
        }
        if flags.contains(PieceFlags::DESCRIPTION) {
            w.write_str(&self.description);
        }
        if let Some(container) = &self.container {
            w.write_i32(container.width);
            w.write_i32(container.height);
        }
        if let Some(fireplace) = &self.fireplace {
            w.write_i32(fireplace.start_fuel);
            w.write_i32(fireplace.max_fuel);
            w.write_i32(fireplace.seconds_per_fuel);
            w.write_str(&fireplace.fuel_item_name);
        }
        if let Some(fermenter) = &self.fermenter {
            w.write_i32(fermenter.duration_seconds);
            write_conversions(w, fermenter.conversions.as_ref());
        }
        if let Some(smelter) = &self.smelter {
            let fuel = non_empty(&smelter.fuel_item_name);
            w.write_bool(fuel.is_some());
            if let Some(fuel) = fuel {
                w.write_str(fuel);
            }
            w.write_i32(smelter.max_ore);
            w.write_i32(smelter.max_fuel);
            w.write_i32(smelter.fuel_per_product);
            w.write_i32(smelter.seconds_per_product);
            write_conversions(w, smelter.conversions.as_ref());
        }
        if flags.contains(PieceFlags::CRAFTING_STATION) {
            w.write_str(&self.crafting_station);
        }
    }

    fn decode_from(r: &mut PackageReader<'_>) -> Result<Self, CodecError> {
        let flags = PieceFlags::from_bits_truncate(r.read_i32()?);
        let mut d = PieceDescriptor::default();

        if flags.contains(PieceFlags::HEALTH) {
            d.health = Some(r.read_i32()?);
        }
        if flags.contains(PieceFlags::DAMAGE_MODIFIERS) {
            d.damage_modifiers = Some(read_modifiers(r)?);
        }
        if flags.contains(PieceFlags::BUILD) {
            d.build = Some(read_requirements(r)?);
        }
        if flags.contains(PieceFlags::NAME) {
            d.name = r.read_string()?;
        }
        if flags.contains(PieceFlags::DESCRIPTION) {
            d.description = r.read_string()?;
        }
        if flags.contains(PieceFlags::CONTAINER) {
            d.container = Some(ContainerSpec {
                width: r.read_i32()?,
                height: r.read_i32()?,
            });
        }
        if flags.contains(PieceFlags::FIREPLACE) {
            d.fireplace = Some(FireplaceSpec {
                start_fuel: r.read_i32()?,
                max_fuel: r.read_i32()?,
                seconds_per_fuel: r.read_i32()?,
                fuel_item_name: r.read_string()?,
            });
        }
        if flags.contains(PieceFlags::FERMENTER) {
            d.fermenter = Some(FermenterSpec {
                duration_seconds: r.read_i32()?,
                conversions: read_conversions(r)?,
            });
        }
        if flags.contains(PieceFlags::SMELTER) {
            let fuel_item_name = if r.read_bool()? {
                r.read_string()?
            } else {
                String::new()
            };
            d.smelter = Some(SmelterSpec {
                fuel_item_name,
                max_ore: r.read_i32()?,
                max_fuel: r.read_i32()?,
                fuel_per_product: r.read_i32()?,
                seconds_per_product: r.read_i32()?,
                conversions: read_conversions(r)?,
            });
        }
        if flags.contains(PieceFlags::CRAFTING_STATION) {
            d.crafting_station = r.read_string()?;
        }
        Ok(d)
    }
}

// ---------------------------------------------------------------------------
// MonsterDescriptor
// ---------------------------------------------------------------------------

impl MonsterDescriptor {
    /// Presence bits this descriptor would be written with.
    pub fn flags(&self) -> MonsterFlags {
        let mut flags = MonsterFlags::empty();
        flags.set(MonsterFlags::NAME, !self.name.is_empty());
        flags.set(MonsterFlags::HEALTH, self.health.is_some());
        flags.set(MonsterFlags::WALK_SPEED, self.walk_speed.is_some());
        flags.set(MonsterFlags::SWIM_SPEED, self.swim_speed.is_some());
        flags.set(MonsterFlags::DAMAGE_MULTIPLIER, self.damage_multiplier.is_some());
        flags.set(MonsterFlags::CLONE_SOURCE, !self.clone_source.is_empty());
        flags
    }
}

impl Descriptor for MonsterDescriptor {
    const KIND: EntityKind = EntityKind::Monster;

    fn clone_source(&self) -> Option<&str> {
        non_empty(&self.clone_source)
    }

    fn encode_into(&self, w: &mut PackageWriter) {
        let flags = self.flags();
        w.write_i32(flags.bits());

        if flags.contains(MonsterFlags::NAME) {
            w.write_str(&self.name);
        }
        if let Some(health) = self.health {
            w.write_i32(health);
        }
        if let Some(speed) = self.walk_speed {
            w.write_f32(speed);
        }
        if let Some(speed) = self.swim_speed {
            w.write_f32(speed);
        }
        if let Some(multiplier) = self.damage_multiplier {
            w.write_f32(multiplier);
        }
        if flags.contains(MonsterFlags::CLONE_SOURCE) {
            w.write_str(&self.clone_source);
        }
    }

    fn decode_from(r: &mut PackageReader<'_>) -> Result<Self, CodecError> {
        let flags = MonsterFlags::from_bits_truncate(r.read_i32()?);
        let mut d = MonsterDescriptor::default();

        if flags.contains(MonsterFlags::NAME) {
            d.name = r.read_string()?;
        }
        if flags.contains(MonsterFlags::HEALTH) {
            d.health = Some(r.read_i32()?);
        }
        if flags.contains(MonsterFlags::WALK_SPEED) {
            d.walk_speed = Some(r.read_f32()?);
        }
        if flags.contains(MonsterFlags::SWIM_SPEED) {
            d.swim_speed = Some(r.read_f32()?);
        }
        if flags.contains(MonsterFlags::DAMAGE_MULTIPLIER) {
            d.damage_multiplier = Some(r.read_f32()?);
        }
        if flags.contains(MonsterFlags::CLONE_SOURCE) {
            d.clone_source = r.read_string()?;
        }
        Ok(d)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
