//! Property tests for the descriptor codec.
//!
//! Random descriptors of every kind must survive encode/decode unchanged,
//! whole snapshots must do the same, and decoding must never panic on
//! arbitrary bytes.

use std::collections::BTreeMap;

use patchwright_core::codec::{ItemFlags, MonsterFlags, PieceFlags};
use patchwright_core::prelude::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Strings that may be empty (empty means "absent" for descriptor fields).
fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ $é]{0,16}"
}

fn template_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,15}"
}

/// Finite f32 values so equality comparisons are meaningful.
fn finite_f32() -> impl Strategy<Value = f32> {
    (-1_000_000i32..1_000_000i32).prop_map(|v| v as f32 * 0.01)
}

/// Resource names may be empty or hold separators and padding; the wire
/// form must carry them unchanged.
fn resource_name() -> impl Strategy<Value = String> {
    prop_oneof![template_name(), "[A-Za-z0-9 :_é]{0,12}"]
}

fn requirement() -> impl Strategy<Value = Requirement> {
    (resource_name(), any::<i32>(), any::<bool>())
        .prop_map(|(resource, amount, recover)| Requirement::new(resource, amount, recover))
}

fn requirements() -> impl Strategy<Value = Option<Vec<Requirement>>> {
    prop::option::of(prop::collection::vec(requirement(), 0..6))
}

fn damage() -> impl Strategy<Value = Option<DamageTypes>> {
    prop::option::of(prop::array::uniform10(any::<i32>()).prop_map(DamageTypes::from_array))
}

fn damage_modifier() -> impl Strategy<Value = DamageModifier> {
    (0i32..9).prop_map(|v| DamageModifier::from_wire(v).unwrap())
}

fn conversions() -> impl Strategy<Value = Option<Vec<Conversion>>> {
    prop::option::of(prop::collection::vec(
        (text(), text(), any::<i32>()).prop_map(|(from, to, amount)| Conversion { from, to, amount }),
        0..4,
    ))
}

fn item_descriptor() -> impl Strategy<Value = ItemDescriptor> {
    (
        (text(), text(), text()),
        (
            prop::option::of(any::<i32>()),
            prop::option::of(any::<i32>()),
            prop::option::of(any::<i32>()),
        ),
        requirements(),
        damage(),
        damage(),
        text(),
    )
        .prop_map(
            |(
                (name, description, crafting_station),
                (weight, max_durability, repair_station_level),
                craft,
                damage,
                damage_per_level,
                clone_source,
            )| ItemDescriptor {
                name,
                description,
                crafting_station,
                weight,
                max_durability,
                repair_station_level,
                craft,
                damage,
                damage_per_level,
                clone_source,
                ..Default::default()
            },
        )
}

fn piece_descriptor() -> impl Strategy<Value = PieceDescriptor> {
    let container = prop::option::of(
        (any::<i32>(), any::<i32>()).prop_map(|(width, height)| ContainerSpec { width, height }),
    );
    let fireplace = prop::option::of((any::<i32>(), any::<i32>(), any::<i32>(), text()).prop_map(
        |(start_fuel, max_fuel, seconds_per_fuel, fuel_item_name)| FireplaceSpec {
            start_fuel,
            max_fuel,
            seconds_per_fuel,
            fuel_item_name,
        },
    ));
    let fermenter = prop::option::of((any::<i32>(), conversions()).prop_map(
        |(duration_seconds, conversions)| FermenterSpec {
            duration_seconds,
            conversions,
        },
    ));
    let smelter = prop::option::of(
        (
            text(),
            prop::array::uniform4(any::<i32>()),
            conversions(),
        )
            .prop_map(|(fuel_item_name, [max_ore, max_fuel, fuel_per_product, seconds_per_product], conversions)| {
                SmelterSpec {
                    fuel_item_name,
                    max_ore,
                    max_fuel,
                    fuel_per_product,
                    seconds_per_product,
                    conversions,
                }
            }),
    );
    let modifiers = prop::option::of(
        prop::array::uniform10(damage_modifier()).prop_map(DamageModifiers::from_array),
    );

    (
        prop::option::of(any::<i32>()),
        modifiers,
        requirements(),
        (text(), text(), text()),
        (container, fireplace, fermenter, smelter),
    )
        .prop_map(
            |(
                health,
                damage_modifiers,
                build,
                (name, description, crafting_station),
                (container, fireplace, fermenter, smelter),
            )| PieceDescriptor {
                health,
                damage_modifiers,
                build,
                name,
                description,
                container,
                fireplace,
                fermenter,
                smelter,
                crafting_station,
            },
        )
}

fn monster_descriptor() -> impl Strategy<Value = MonsterDescriptor> {
    (
        text(),
        prop::option::of(any::<i32>()),
        prop::option::of(finite_f32()),
        prop::option::of(finite_f32()),
        prop::option::of(finite_f32()),
        text(),
    )
        .prop_map(
            |(name, health, walk_speed, swim_speed, damage_multiplier, clone_source)| {
                MonsterDescriptor {
                    name,
                    health,
                    walk_speed,
                    swim_speed,
                    damage_multiplier,
                    clone_source,
                }
            },
        )
}

// ---------------------------------------------------------------------------
// Round-trip law
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn item_round_trips(d in item_descriptor()) {
        let bytes = encode(&d);
        prop_assert_eq!(decode::<ItemDescriptor>(&bytes).unwrap(), d);
    }

    #[test]
    fn piece_round_trips(d in piece_descriptor()) {
        let bytes = encode(&d);
        prop_assert_eq!(decode::<PieceDescriptor>(&bytes).unwrap(), d);
    }

    #[test]
    fn monster_round_trips(d in monster_descriptor()) {
        let bytes = encode(&d);
        prop_assert_eq!(decode::<MonsterDescriptor>(&bytes).unwrap(), d);
    }

    #[test]
    fn item_snapshot_round_trips(
        entries in prop::collection::btree_map(template_name(), item_descriptor(), 0..8)
    ) {
        let bytes = encode_snapshot(&entries);
        prop_assert_eq!(decode_snapshot::<ItemDescriptor>(&bytes).unwrap(), entries);
    }

    #[test]
    fn piece_snapshot_round_trips(
        entries in prop::collection::btree_map(template_name(), piece_descriptor(), 0..8)
    ) {
        let bytes = encode_snapshot(&entries);
        prop_assert_eq!(decode_snapshot::<PieceDescriptor>(&bytes).unwrap(), entries);
    }

    /// Setting a bit this version does not know must not change the result.
    #[test]
    fn future_bits_are_ignored(d in monster_descriptor(), extra in 6u32..31) {
        let mut bytes = encode(&d);
        let mask = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) | (1 << extra);
        bytes[..4].copy_from_slice(&mask.to_le_bytes());
        prop_assert_eq!(decode::<MonsterDescriptor>(&bytes).unwrap(), d);
    }

    /// Arbitrary bytes either decode or return an error; they never panic.
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = decode::<ItemDescriptor>(&bytes);
        let _ = decode::<PieceDescriptor>(&bytes);
        let _ = decode::<MonsterDescriptor>(&bytes);
        let _ = decode_snapshot::<PieceDescriptor>(&bytes);
    }
}

// ---------------------------------------------------------------------------
// Wire size
// ---------------------------------------------------------------------------

#[test]
fn sparse_descriptors_stay_small() {
    let d = ItemDescriptor {
        weight: Some(4),
        ..Default::default()
    };
    assert_eq!(encode(&d).len(), 8);

    let d = PieceDescriptor {
        name: "Hut".to_owned(),
        ..Default::default()
    };
    // bitmask + length byte + 3 bytes of text
    assert_eq!(encode(&d).len(), 8);
}

#[test]
fn flags_cover_exactly_ten_or_six_bits() {
    assert_eq!(ItemFlags::all().bits(), 0x3ff);
    assert_eq!(PieceFlags::all().bits(), 0x3ff);
    assert_eq!(MonsterFlags::all().bits(), 0x3f);
}

#[test]
fn snapshot_with_duplicate_keys_keeps_last() {
    let first = MonsterDescriptor {
        health: Some(1),
        ..Default::default()
    };
    let second = MonsterDescriptor {
        health: Some(2),
        ..Default::default()
    };
    let mut w = PackageWriter::new();
    w.write_i32(2);
    w.write_str("Wolf");
    first.encode_into(&mut w);
    w.write_str("Wolf");
    second.encode_into(&mut w);

    let decoded = decode_snapshot::<MonsterDescriptor>(w.as_bytes()).unwrap();
    let mut expected = BTreeMap::new();
    expected.insert("Wolf".to_owned(), second);
    assert_eq!(decoded, expected);
}
