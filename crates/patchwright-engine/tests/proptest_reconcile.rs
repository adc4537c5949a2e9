//! Property tests for the layering laws of reconciliation.
//!
//! Republishing a snapshot changes nothing, a later snapshot lands on top of
//! an earlier one field by field, and an empty snapshot never undoes a
//! previous patch.

use std::collections::BTreeMap;

use patchwright_engine::apply::{apply_creature, apply_item_shared};
use patchwright_engine::prelude::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_monster() -> impl Strategy<Value = MonsterDescriptor> {
    (
        "[A-Za-z ]{0,8}",
        proptest::option::of(1..5000i32),
        proptest::option::of(0.0f32..20.0),
        proptest::option::of(0.0f32..20.0),
    )
        .prop_map(|(name, health, walk_speed, swim_speed)| MonsterDescriptor {
            name,
            health,
            walk_speed,
            swim_speed,
            ..Default::default()
        })
}

fn arb_item() -> impl Strategy<Value = ItemDescriptor> {
    (
        "[A-Za-z ]{0,8}",
        proptest::option::of(0..100i32),
        proptest::option::of(0..1000i32),
        proptest::option::of(0..200i32),
    )
        .prop_map(|(description, weight, max_durability, slash)| ItemDescriptor {
            description,
            weight,
            max_durability,
            damage: slash.map(|slash| DamageTypes {
                slash,
                ..Default::default()
            }),
            ..Default::default()
        })
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

struct Setup {
    host: MemoryHost,
    store: OverrideStore,
    engine: ReconciliationEngine,
    template: Handle,
    spawned: Handle,
    chest: ContainerId,
}

fn setup() -> Setup {
    let mut host = MemoryHost::new();
    host.add_item(
        "Club",
        ItemData {
            name: "Club".to_owned(),
            weight: 2.0,
            max_durability: 50.0,
            ..Default::default()
        },
    );
    let template = host.add_creature(
        "Deer",
        CreatureData {
            name: "Deer".to_owned(),
            health: 30.0,
            walk_speed: 1.5,
            swim_speed: 1.0,
        },
    );
    let spawned = host.spawn(EntityKind::Monster, "Deer").unwrap();
    let chest = host.create_container();
    host.add_stack(chest, "Club", 1).unwrap();

    let mut engine = ReconciliationEngine::new();
    engine.register_container(chest);
    Setup {
        host,
        store: OverrideStore::new(),
        engine,
        template,
        spawned,
        chest,
    }
}

fn publish_and_poll<D: Reconcile>(s: &mut Setup, name: &str, d: Option<D>) {
    let mut entries = BTreeMap::new();
    if let Some(d) = d {
        entries.insert(name.to_owned(), d);
    }
    s.store.publish(entries);
    s.engine.poll(&mut s.host, &s.store);
}

fn deer(s: &Setup) -> (CreatureData, CreatureData) {
    (
        s.host.creature_data(s.template).unwrap().clone(),
        s.host.creature_data(s.spawned).unwrap().clone(),
    )
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn republishing_is_idempotent(d in arb_monster()) {
        let mut s = setup();
        publish_and_poll(&mut s, "Deer", Some(d.clone()));
        let once = deer(&s);
        publish_and_poll(&mut s, "Deer", Some(d));
        prop_assert_eq!(deer(&s), once);
    }

    #[test]
    fn later_snapshot_layers_over_earlier(a in arb_monster(), b in arb_monster()) {
        let mut s = setup();
        let (mut expected, _) = deer(&s);
        apply_creature(&a, &mut expected);
        apply_creature(&b, &mut expected);

        publish_and_poll(&mut s, "Deer", Some(a));
        publish_and_poll(&mut s, "Deer", Some(b));

        let (template, spawned) = deer(&s);
        prop_assert_eq!(&template, &expected);
        prop_assert_eq!(&spawned, &expected);
    }

    #[test]
    fn empty_snapshot_never_undoes_a_patch(d in arb_monster()) {
        let mut s = setup();
        publish_and_poll(&mut s, "Deer", Some(d));
        let patched = deer(&s);
        publish_and_poll::<MonsterDescriptor>(&mut s, "Deer", None);
        prop_assert_eq!(deer(&s), patched);
    }

    #[test]
    fn stacks_and_templates_agree(a in arb_item(), b in arb_item()) {
        let mut s = setup();
        publish_and_poll(&mut s, "Club", Some(a));
        publish_and_poll(&mut s, "Club", Some(b.clone()));

        let club = s.host.lookup_template(EntityKind::Item, "Club").unwrap();
        let template = s.host.item_data(club).unwrap().clone();
        let stack = s.host.stacks(s.chest)[0].data.clone();
        prop_assert_eq!(&stack, &template);

        // Reapplying the latest descriptor is a no-op.
        let mut again = template.clone();
        apply_item_shared(&b, &mut again);
        prop_assert_eq!(again, template);
    }
}
