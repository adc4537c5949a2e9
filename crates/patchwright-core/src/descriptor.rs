//! Override descriptor records.
//!
//! Each descriptor is a sparse record: a string field is *present* when it is
//! non-empty, a numeric field when it is `Some`, and a list or sub-record when
//! it is `Some`. Absent fields are never written to the wire and are left
//! untouched on the target when the descriptor is applied.
//!
//! The records also derive `serde` so operators can author them as text. Each
//! field's `#[serde(alias = ...)]` list is the static table of external names
//! the text parser recognises for it; unknown keys are ignored.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CodecError;

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

// ---------------------------------------------------------------------------
// Requirement
// ---------------------------------------------------------------------------

/// One build/craft requirement: a resource template, an amount, and whether
/// the resource is refunded when the result is dismantled.
///
/// The wire and text form is `"<resource>:<amount>[:<recover>]"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Requirement {
    pub resource: String,
    pub amount: i32,
    pub recover: bool,
}

impl Requirement {
    pub fn new(resource: impl Into<String>, amount: i32, recover: bool) -> Self {
        Self {
            resource: resource.into(),
            amount,
            recover,
        }
    }
}

impl Requirement {
    /// Parse the exact form written by [`Display`](fmt::Display).
    ///
    /// Unlike [`FromStr`], which reads operator-authored text, this form is
    /// taken from the right: the last two fields are the amount and the
    /// `True`/`False` flag, and everything before them is the resource
    /// verbatim, colons and whitespace included. An empty resource decodes
    /// as-is and is left for the applier to reject.
    pub fn from_wire(text: &str) -> Result<Self, CodecError> {
        let malformed = |reason: &str| CodecError::MalformedRequirement {
            text: text.to_owned(),
            reason: reason.to_owned(),
        };

        let mut parts = text.rsplitn(3, ':');
        let recover = match parts.next() {
            Some("True") => true,
            Some("False") => false,
            _ => return Err(malformed("missing recover flag")),
        };
        let amount = parts
            .next()
            .ok_or_else(|| malformed("missing amount"))?
            .parse::<i32>()
            .map_err(|e| malformed(&e.to_string()))?;
        let resource = parts.next().ok_or_else(|| malformed("missing resource name"))?;

        Ok(Self::new(resource, amount, recover))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recover = if self.recover { "True" } else { "False" };
        write!(f, "{}:{}:{}", self.resource, self.amount, recover)
    }
}

impl FromStr for Requirement {
    type Err = CodecError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| CodecError::MalformedRequirement {
            text: text.to_owned(),
            reason: reason.to_owned(),
        };

        let mut parts = text.split(':');
        let resource = parts.next().unwrap_or_default().trim();
        if resource.is_empty() {
            return Err(malformed("missing resource name"));
        }
        let amount = parts
            .next()
            .ok_or_else(|| malformed("missing amount"))?
            .trim()
            .parse::<i32>()
            .map_err(|e| malformed(&e.to_string()))?;
        let recover = match parts.next().map(str::trim) {
            None => false,
            Some(flag) if flag.eq_ignore_ascii_case("true") => true,
            Some(flag) if flag.eq_ignore_ascii_case("false") => false,
            Some(flag) => return Err(malformed(&format!("invalid recover flag '{flag}'"))),
        };

        Ok(Self {
            resource: resource.to_owned(),
            amount,
            recover,
        })
    }
}

impl TryFrom<String> for Requirement {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Requirement> for String {
    fn from(value: Requirement) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Damage vectors
// ---------------------------------------------------------------------------

/// Ten-component damage vector, in wire order.
///
/// Descriptors carry whole-number components; live item data uses `f32`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    default,
    rename_all = "PascalCase",
    bound(deserialize = "T: Deserialize<'de> + Default")
)]
pub struct DamageTypes<T = i32> {
    pub blunt: T,
    pub slash: T,
    pub pierce: T,
    pub chop: T,
    pub pickaxe: T,
    pub fire: T,
    pub frost: T,
    pub lightning: T,
    pub poison: T,
    pub spirit: T,
}

impl<T: Copy> DamageTypes<T> {
    /// Components in wire order.
    pub fn to_array(&self) -> [T; 10] {
        [
            self.blunt,
            self.slash,
            self.pierce,
            self.chop,
            self.pickaxe,
            self.fire,
            self.frost,
            self.lightning,
            self.poison,
            self.spirit,
        ]
    }

    /// Build from components in wire order.
    pub fn from_array(v: [T; 10]) -> Self {
        let [blunt, slash, pierce, chop, pickaxe, fire, frost, lightning, poison, spirit] = v;
        Self {
            blunt,
            slash,
            pierce,
            chop,
            pickaxe,
            fire,
            frost,
            lightning,
            poison,
            spirit,
        }
    }

    /// Convert every component.
    pub fn map<U: Copy>(&self, f: impl FnMut(T) -> U) -> DamageTypes<U> {
        DamageTypes::from_array(self.to_array().map(f))
    }
}

/// How a structure reacts to one damage type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageModifier {
    #[default]
    Normal,
    Resistant,
    Weak,
    Immune,
    Ignore,
    VeryResistant,
    VeryWeak,
    SlightlyResistant,
    SlightlyWeak,
}

impl DamageModifier {
    /// Wire value.
    pub fn to_wire(self) -> i32 {
        self as i32
    }

    /// Parse a wire value.
    pub fn from_wire(value: i32) -> Result<Self, CodecError> {
        Ok(match value {
            0 => Self::Normal,
            1 => Self::Resistant,
            2 => Self::Weak,
            3 => Self::Immune,
            4 => Self::Ignore,
            5 => Self::VeryResistant,
            6 => Self::VeryWeak,
            7 => Self::SlightlyResistant,
            8 => Self::SlightlyWeak,
            _ => return Err(CodecError::UnknownDamageModifier { value }),
        })
    }
}

/// Ten-component damage-modifier vector, in wire order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DamageModifiers {
    pub blunt: DamageModifier,
    pub slash: DamageModifier,
    pub pierce: DamageModifier,
    pub chop: DamageModifier,
    pub pickaxe: DamageModifier,
    pub fire: DamageModifier,
    pub frost: DamageModifier,
    pub lightning: DamageModifier,
    pub poison: DamageModifier,
    pub spirit: DamageModifier,
}

impl DamageModifiers {
    pub fn to_array(&self) -> [DamageModifier; 10] {
        [
            self.blunt,
            self.slash,
            self.pierce,
            self.chop,
            self.pickaxe,
            self.fire,
            self.frost,
            self.lightning,
            self.poison,
            self.spirit,
        ]
    }

    pub fn from_array(v: [DamageModifier; 10]) -> Self {
        let [blunt, slash, pierce, chop, pickaxe, fire, frost, lightning, poison, spirit] = v;
        Self {
            blunt,
            slash,
            pierce,
            chop,
            pickaxe,
            fire,
            frost,
            lightning,
            poison,
            spirit,
        }
    }
}

// ---------------------------------------------------------------------------
// ItemDescriptor
// ---------------------------------------------------------------------------

/// Override record for an item template.
///
/// `has_recipe` and `has_crafting_station` are not carried on the wire and
/// default to `true`. They are only `false` on descriptors captured from a
/// live item with no recipe (or a recipe without a station), and make
/// applying such a descriptor remove the recipe (or station) instead of
/// leaving it untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ItemDescriptor {
    #[serde(alias = "m_name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(alias = "m_description", skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(
        alias = "m_craftingStation",
        alias = "craftingStation",
        skip_serializing_if = "String::is_empty"
    )]
    pub crafting_station: String,
    #[serde(alias = "m_weight", skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
    #[serde(alias = "m_maxDurability", skip_serializing_if = "Option::is_none")]
    pub max_durability: Option<i32>,
    #[serde(alias = "minStationLevel", skip_serializing_if = "Option::is_none")]
    pub repair_station_level: Option<i32>,
    #[serde(alias = "Build", alias = "reqs", skip_serializing_if = "Option::is_none")]
    pub craft: Option<Vec<Requirement>>,
    #[serde(alias = "Damages", skip_serializing_if = "Option::is_none")]
    pub damage: Option<DamageTypes>,
    #[serde(alias = "Damage_Per_Level", skip_serializing_if = "Option::is_none")]
    pub damage_per_level: Option<DamageTypes>,
    #[serde(alias = "clonePrefabName", skip_serializing_if = "String::is_empty")]
    pub clone_source: String,
    #[serde(skip_deserializing, default = "default_true", skip_serializing_if = "is_true")]
    pub has_recipe: bool,
    #[serde(skip_deserializing, default = "default_true", skip_serializing_if = "is_true")]
    pub has_crafting_station: bool,
}

impl Default for ItemDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            crafting_station: String::new(),
            weight: None,
            max_durability: None,
            repair_station_level: None,
            craft: None,
            damage: None,
            damage_per_level: None,
            clone_source: String::new(),
            has_recipe: true,
            has_crafting_station: true,
        }
    }
}

// ---------------------------------------------------------------------------
// PieceDescriptor and its sub-records
// ---------------------------------------------------------------------------

/// Storage grid size for pieces with a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContainerSpec {
    pub width: i32,
    pub height: i32,
}

/// Fuel settings for pieces that burn fuel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FireplaceSpec {
    pub start_fuel: i32,
    pub max_fuel: i32,
    #[serde(alias = "SecPerFuel")]
    pub seconds_per_fuel: i32,
    #[serde(alias = "FuelItem")]
    pub fuel_item_name: String,
}

/// One input-to-output conversion of a processing station.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub amount: i32,
}

/// Fermentation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FermenterSpec {
    #[serde(alias = "Duration")]
    pub duration_seconds: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversions: Option<Vec<Conversion>>,
}

/// Smelting settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SmelterSpec {
    #[serde(alias = "FuelItem", skip_serializing_if = "String::is_empty")]
    pub fuel_item_name: String,
    pub max_ore: i32,
    pub max_fuel: i32,
    pub fuel_per_product: i32,
    #[serde(alias = "SecPerProduct")]
    pub seconds_per_product: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversions: Option<Vec<Conversion>>,
}

/// Override record for a buildable piece template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PieceDescriptor {
    #[serde(alias = "m_health", skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    #[serde(alias = "m_damages", skip_serializing_if = "Option::is_none")]
    pub damage_modifiers: Option<DamageModifiers>,
    #[serde(alias = "m_resources", alias = "reqs", skip_serializing_if = "Option::is_none")]
    pub build: Option<Vec<Requirement>>,
    #[serde(alias = "m_name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(alias = "m_description", skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fireplace: Option<FireplaceSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fermenter: Option<FermenterSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smelter: Option<SmelterSpec>,
    #[serde(
        alias = "m_craftingStation",
        alias = "craftingStation",
        skip_serializing_if = "String::is_empty"
    )]
    pub crafting_station: String,
}

// ---------------------------------------------------------------------------
// MonsterDescriptor
// ---------------------------------------------------------------------------

/// Override record for a creature template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct MonsterDescriptor {
    #[serde(alias = "m_name", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(alias = "m_health", skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    #[serde(alias = "m_walkSpeed", skip_serializing_if = "Option::is_none")]
    pub walk_speed: Option<f32>,
    #[serde(alias = "m_swimSpeed", skip_serializing_if = "Option::is_none")]
    pub swim_speed: Option<f32>,
    #[serde(alias = "m_damageMultiplier", skip_serializing_if = "Option::is_none")]
    pub damage_multiplier: Option<f32>,
    #[serde(alias = "clonePrefabName", skip_serializing_if = "String::is_empty")]
    pub clone_source: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirement_parses_all_forms() {
        assert_eq!(
            "Wood:10:True".parse::<Requirement>().unwrap(),
            Requirement::new("Wood", 10, true)
        );
        assert_eq!(
            "Stone:2".parse::<Requirement>().unwrap(),
            Requirement::new("Stone", 2, false)
        );
        assert_eq!(
            "Resin:1:false".parse::<Requirement>().unwrap(),
            Requirement::new("Resin", 1, false)
        );
    }

    #[test]
    fn requirement_rejects_garbage() {
        assert!(matches!(
            "Wood".parse::<Requirement>(),
            Err(CodecError::MalformedRequirement { .. })
        ));
        assert!(matches!(
            "Wood:lots".parse::<Requirement>(),
            Err(CodecError::MalformedRequirement { .. })
        ));
        assert!(matches!(
            ":3".parse::<Requirement>(),
            Err(CodecError::MalformedRequirement { .. })
        ));
        assert!(matches!(
            "Wood:3:maybe".parse::<Requirement>(),
            Err(CodecError::MalformedRequirement { .. })
        ));
    }

    #[test]
    fn requirement_display_round_trips() {
        let req = Requirement::new("Bronze", 4, true);
        assert_eq!(req.to_string(), "Bronze:4:True");
        assert_eq!(req.to_string().parse::<Requirement>().unwrap(), req);
    }

    #[test]
    fn wire_form_keeps_resource_verbatim() {
        for req in [
            Requirement::new("", 1, false),
            Requirement::new("Iron:Bar", 2, true),
            Requirement::new(" Wood ", -3, true),
            Requirement::new("a::b:", i32::MIN, false),
        ] {
            assert_eq!(Requirement::from_wire(&req.to_string()).unwrap(), req);
        }
    }

    #[test]
    fn wire_form_requires_exact_flag() {
        assert!(Requirement::from_wire("Wood:2").is_err());
        assert!(Requirement::from_wire("Wood:2:true").is_err());
        assert!(Requirement::from_wire("Wood: 2:True").is_err());
        assert!(Requirement::from_wire("2:True").is_err());
    }

    #[test]
    fn damage_modifier_wire_values_are_stable() {
        assert_eq!(DamageModifier::Normal.to_wire(), 0);
        assert_eq!(DamageModifier::SlightlyWeak.to_wire(), 8);
        for v in 0..9 {
            assert_eq!(DamageModifier::from_wire(v).unwrap().to_wire(), v);
        }
        assert_eq!(
            DamageModifier::from_wire(9),
            Err(CodecError::UnknownDamageModifier { value: 9 })
        );
    }

    #[test]
    fn item_descriptor_accepts_aliases() {
        let json = r#"{
            "m_name": "Sharp sword",
            "craftingStation": "forge",
            "minStationLevel": 2,
            "reqs": ["Iron:5:True", "Wood:2"],
            "Damages": { "Slash": 40 },
            "clonePrefabName": "SwordIron",
            "SomethingUnknown": 12
        }"#;
        let item: ItemDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(item.name, "Sharp sword");
        assert_eq!(item.crafting_station, "forge");
        assert_eq!(item.repair_station_level, Some(2));
        assert_eq!(
            item.craft,
            Some(vec![
                Requirement::new("Iron", 5, true),
                Requirement::new("Wood", 2, false)
            ])
        );
        assert_eq!(item.damage.map(|d| d.slash), Some(40));
        assert_eq!(item.clone_source, "SwordIron");
        assert!(item.has_recipe);
        assert!(item.has_crafting_station);
    }

    #[test]
    fn malformed_requirement_fails_text_parse() {
        let json = r#"{ "Craft": ["Iron"] }"#;
        assert!(serde_json::from_str::<ItemDescriptor>(json).is_err());
    }

    #[test]
    fn piece_descriptor_reads_nested_records() {
        let json = r#"{
            "Health": 800,
            "DamageModifiers": { "Fire": "Immune" },
            "Smelter": { "FuelItem": "Coal", "MaxOre": 20, "Conversions": [
                { "From": "CopperOre", "To": "Copper", "Amount": 1 }
            ]}
        }"#;
        let piece: PieceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(piece.health, Some(800));
        let mods = piece.damage_modifiers.unwrap();
        assert_eq!(mods.fire, DamageModifier::Immune);
        assert_eq!(mods.blunt, DamageModifier::Normal);
        let smelter = piece.smelter.unwrap();
        assert_eq!(smelter.fuel_item_name, "Coal");
        assert_eq!(smelter.max_ore, 20);
        assert_eq!(smelter.conversions.unwrap().len(), 1);
    }
}
