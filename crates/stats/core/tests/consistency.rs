use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use stats_core::{
    Attribute, AttributeBasedFloat, AttributeCapture, AttributeChange, AttributeInitializer,
    CalculatorRegistry, ClampHook, DepletionTracker, EffectContext, EffectDefinition, EngineConfig,
    EntityId, HookRegistry, LevelProvider, LinearCalculation, Magnitude, ModifierOp, StatWorld,
    StacksToRemove,
};

fn hero_world(max: f32, current: f32) -> (StatWorld, EntityId) {
    let mut world = StatWorld::default();
    let hero = world.spawn_standard();
    world.init_attribute(hero, Attribute::MaxHealth, max).expect("hero is alive");
    world.init_attribute(hero, Attribute::Health, current).expect("hero is alive");
    (world, hero)
}

fn apply(world: &mut StatWorld, target: EntityId, definition: EffectDefinition) -> Option<stats_core::ActiveEffectHandle> {
    world
        .apply_effect(Arc::new(definition), 1.0, EffectContext::new(), target)
        .expect("target is alive")
}

fn assert_bounded(world: &StatWorld, hero: EntityId) {
    let health = world.current(hero, Attribute::Health).expect("hero is alive");
    let max = world.current(hero, Attribute::MaxHealth).expect("hero is alive");
    let base = world.base(hero, Attribute::Health).expect("hero is alive");
    assert!((0.0..=max.max(0.0)).contains(&health), "health {health} outside [0, {max}]");
    assert!(base >= 0.0, "health base {base} went negative");
}

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn current_stays_within_bounds_across_mixed_effects() {
    let (mut world, hero) = hero_world(100.0, 90.0);

    let curse = apply(
        &mut world,
        hero,
        EffectDefinition::infinite("curse").with_modifier(Attribute::MaxHealth, ModifierOp::Add, -60.0),
    )
    .expect("handle");
    assert_bounded(&world, hero);
    assert_eq!(world.current(hero, Attribute::Health), Some(40.0));

    apply(
        &mut world,
        hero,
        EffectDefinition::instant("potion").with_modifier(Attribute::Health, ModifierOp::Add, 500.0),
    );
    assert_bounded(&world, hero);

    apply(
        &mut world,
        hero,
        EffectDefinition::instant("meteor").with_modifier(Attribute::Health, ModifierOp::Add, -1000.0),
    );
    assert_bounded(&world, hero);
    assert_eq!(world.current(hero, Attribute::Health), Some(0.0));

    world.remove_by_handle(curse, StacksToRemove::All);
    assert_bounded(&world, hero);
    assert_eq!(world.current(hero, Attribute::MaxHealth), Some(100.0));
}

#[test]
fn instant_max_reduction_pulls_base_down_with_it() {
    let (mut world, hero) = hero_world(100.0, 90.0);

    apply(
        &mut world,
        hero,
        EffectDefinition::instant("wither").with_modifier(Attribute::MaxHealth, ModifierOp::Add, -50.0),
    );
    assert_eq!(world.current(hero, Attribute::Health), Some(50.0));
    assert_eq!(world.base(hero, Attribute::Health), Some(50.0));

    // Restoring the maximum does not bring back the overflow
    apply(
        &mut world,
        hero,
        EffectDefinition::instant("restore").with_modifier(Attribute::MaxHealth, ModifierOp::Add, 50.0),
    );
    assert_eq!(world.current(hero, Attribute::Health), Some(50.0));
}

#[test]
fn duration_max_reduction_is_undone_on_removal() {
    let (mut world, hero) = hero_world(100.0, 90.0);

    let weaken = apply(
        &mut world,
        hero,
        EffectDefinition::duration("weaken", 5.0).with_modifier(Attribute::MaxHealth, ModifierOp::Add, -50.0),
    )
    .expect("handle");
    assert_eq!(world.current(hero, Attribute::Health), Some(50.0));
    assert_eq!(world.base(hero, Attribute::Health), Some(90.0));

    world.remove_by_handle(weaken, StacksToRemove::All);
    assert_eq!(world.current(hero, Attribute::Health), Some(90.0));
}

#[test]
fn base_written_under_a_removed_max_buff_is_pulled_down_on_next_execution() {
    let (mut world, hero) = hero_world(100.0, 90.0);

    let vitality = apply(
        &mut world,
        hero,
        EffectDefinition::duration("vitality", 10.0).with_modifier(Attribute::MaxHealth, ModifierOp::Add, 100.0),
    )
    .expect("handle");
    apply(
        &mut world,
        hero,
        EffectDefinition::instant("feast").with_modifier(Attribute::Health, ModifierOp::Add, 100.0),
    );
    assert_eq!(world.base(hero, Attribute::Health), Some(190.0));

    world.remove_by_handle(vitality, StacksToRemove::All);
    assert_eq!(world.current(hero, Attribute::Health), Some(100.0));

    // Any later execution settles the base, even one touching no vital
    apply(
        &mut world,
        hero,
        EffectDefinition::instant("training").with_modifier(Attribute::Strength, ModifierOp::Add, 1.0),
    );
    assert_eq!(world.base(hero, Attribute::Health), Some(100.0));

    apply(
        &mut world,
        hero,
        EffectDefinition::duration("vitality", 10.0).with_modifier(Attribute::MaxHealth, ModifierOp::Add, 100.0),
    );
    assert_eq!(world.current(hero, Attribute::Health), Some(100.0));
}

#[test]
fn removal_is_idempotent() {
    let (mut world, hero) = hero_world(100.0, 90.0);
    let handle = apply(
        &mut world,
        hero,
        EffectDefinition::infinite("ward").with_modifier(Attribute::Armor, ModifierOp::Add, 5.0),
    )
    .expect("handle");

    assert_eq!(world.remove_by_handle(handle, StacksToRemove::All), 1);
    assert_eq!(world.remove_by_handle(handle, StacksToRemove::All), 0);
    assert_eq!(world.current(hero, Attribute::Armor), Some(0.0));
}

#[test]
fn partial_stack_removal_keeps_the_rest() {
    let (mut world, hero) = hero_world(100.0, 90.0);
    let poison = || {
        EffectDefinition::infinite("poison")
            .with_modifier(Attribute::HealthRegeneration, ModifierOp::Add, -1.0)
            .with_stacking(None)
    };
    let handle = apply(&mut world, hero, poison()).expect("handle");
    apply(&mut world, hero, poison());
    apply(&mut world, hero, poison());
    assert_eq!(world.current(hero, Attribute::HealthRegeneration), Some(-3.0));

    assert_eq!(world.remove_by_handle(handle, StacksToRemove::Count(2)), 2);
    assert_eq!(world.current(hero, Attribute::HealthRegeneration), Some(-1.0));
    assert!(world.has_active_effect(handle));
}

// ============================================================================
// Recompute
// ============================================================================

#[test]
fn live_captures_follow_their_attribute() {
    let (mut world, hero) = hero_world(100.0, 90.0);
    world.init_attribute(hero, Attribute::Dexterity, 5.0).expect("hero is alive");

    apply(
        &mut world,
        hero,
        EffectDefinition::infinite("agile_guard").with_magnitude(
            Attribute::Armor,
            ModifierOp::Add,
            Magnitude::AttributeBased(
                AttributeBasedFloat::new(AttributeCapture::target(Attribute::Dexterity)).with_coefficient(2.0),
            ),
        ),
    );
    assert_eq!(world.current(hero, Attribute::Armor), Some(10.0));

    world.set_base(hero, Attribute::Dexterity, 7.0).expect("hero is alive");
    assert_eq!(world.current(hero, Attribute::Armor), Some(14.0));
}

#[test]
fn snapshotted_captures_ignore_later_changes() {
    let (mut world, hero) = hero_world(100.0, 90.0);
    world.init_attribute(hero, Attribute::Dexterity, 5.0).expect("hero is alive");

    apply(
        &mut world,
        hero,
        EffectDefinition::infinite("frozen_guard").with_magnitude(
            Attribute::Armor,
            ModifierOp::Add,
            Magnitude::AttributeBased(AttributeBasedFloat::new(
                AttributeCapture::target(Attribute::Dexterity).snapshotted(),
            )),
        ),
    );
    world.set_base(hero, Attribute::Dexterity, 7.0).expect("hero is alive");
    assert_eq!(world.current(hero, Attribute::Armor), Some(5.0));
}

#[derive(Debug)]
struct SharedLevel(AtomicI32);

impl LevelProvider for SharedLevel {
    fn actor_level(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }
}

#[test]
fn level_changes_wait_for_a_captured_attribute_to_move() {
    let calculators = CalculatorRegistry::new().with(
        LinearCalculation::new("max_stamina")
            .with_capture(AttributeCapture::target(Attribute::Endurance))
            .with_base(80.0)
            .with_attribute_multiplier(2.5)
            .with_level_multiplier(10.0),
    );
    let mut world = StatWorld::new(EngineConfig::default(), calculators);
    let hero = world.spawn_standard();
    world.init_attribute(hero, Attribute::Endurance, 9.0).expect("hero is alive");

    let level = Arc::new(SharedLevel(AtomicI32::new(1)));
    let context = EffectContext::new().with_source_object(Arc::clone(&level) as Arc<dyn LevelProvider>);
    let definition = EffectDefinition::infinite("stamina_from_endurance").with_magnitude(
        Attribute::MaxStamina,
        ModifierOp::Override,
        Magnitude::Custom("max_stamina".into()),
    );
    world
        .apply_effect(Arc::new(definition), 1.0, context, hero)
        .expect("hero is alive");
    assert_eq!(world.current(hero, Attribute::MaxStamina), Some(112.0));

    level.0.store(3, Ordering::Relaxed);
    assert_eq!(world.current(hero, Attribute::MaxStamina), Some(112.0));

    // 80 + 2.5 × 10 + 10 × 3
    world.set_base(hero, Attribute::Endurance, 10.0).expect("hero is alive");
    assert_eq!(world.current(hero, Attribute::MaxStamina), Some(135.0));
}

#[test]
fn capture_cycle_stops_at_the_depth_cap() {
    let config = EngineConfig::default().with_max_recompute_depth(4);
    let mut world = StatWorld::new(config, CalculatorRegistry::new());
    let hero = world.spawn();
    world.init_attribute(hero, Attribute::Strength, 1.0).expect("hero is alive");

    let feed = |from: Attribute, to: Attribute| {
        EffectDefinition::infinite(format!("{from}_feeds_{to}")).with_magnitude(
            to,
            ModifierOp::Add,
            Magnitude::AttributeBased(AttributeBasedFloat::new(AttributeCapture::target(from))),
        )
    };
    apply(&mut world, hero, feed(Attribute::Strength, Attribute::Dexterity));
    apply(&mut world, hero, feed(Attribute::Dexterity, Attribute::Strength));

    // Terminates; the values themselves are whatever the cap left behind
    let strength = world.current(hero, Attribute::Strength).expect("hero is alive");
    assert!(strength.is_finite());
}

// ============================================================================
// Observers and hooks
// ============================================================================

#[test]
fn observers_see_changes_until_unsubscribed() {
    let (mut world, hero) = hero_world(100.0, 90.0);
    let seen: Arc<Mutex<Vec<AttributeChange>>> = Arc::default();

    let sink = Arc::clone(&seen);
    let token = world
        .subscribe(
            hero,
            Attribute::Health,
            Box::new(move |change: &AttributeChange| sink.lock().expect("observer lock").push(*change)),
        )
        .expect("hero is alive");

    let hit = || EffectDefinition::instant("hit").with_modifier(Attribute::Health, ModifierOp::Add, -10.0);
    apply(&mut world, hero, hit());
    {
        let seen = seen.lock().expect("observer lock");
        assert_eq!(seen.len(), 1);
        assert_eq!((seen[0].old_value, seen[0].new_value), (90.0, 80.0));
    }

    assert!(world.unsubscribe(hero, token));
    apply(&mut world, hero, hit());
    assert_eq!(seen.lock().expect("observer lock").len(), 1);
    assert!(!world.unsubscribe(hero, token));
}

#[test]
fn depletion_tracker_reports_lethal_executions() {
    let tracker = Arc::new(DepletionTracker::health());
    let hooks = HookRegistry::new(vec![Arc::clone(&tracker) as Arc<dyn ClampHook>]);
    let mut world = StatWorld::default().with_hooks(hooks);
    let hero = world.spawn_standard();
    world.init_attribute(hero, Attribute::MaxHealth, 100.0).expect("hero is alive");
    world.init_attribute(hero, Attribute::Health, 90.0).expect("hero is alive");

    apply(
        &mut world,
        hero,
        EffectDefinition::instant("scratch").with_modifier(Attribute::Health, ModifierOp::Add, -5.0),
    );
    assert!(!tracker.is_depleted(hero));

    apply(
        &mut world,
        hero,
        EffectDefinition::instant("meteor").with_modifier(Attribute::Health, ModifierOp::Add, -200.0),
    );
    assert_eq!(tracker.take(), vec![(hero, Attribute::Health)]);
    assert_eq!(world.current(hero, Attribute::Health), Some(0.0));
}

// ============================================================================
// Initialization
// ============================================================================

fn self_based(attribute: Attribute) -> AttributeBasedFloat {
    AttributeBasedFloat::new(AttributeCapture::source(attribute))
}

#[test]
fn initializer_applies_primary_then_secondary_then_vital() {
    let primary = EffectDefinition::instant("init_primary")
        .with_modifier(Attribute::Vigor, ModifierOp::Override, 10.0)
        .with_modifier(Attribute::Intelligence, ModifierOp::Override, 12.0);
    let secondary = EffectDefinition::instant("init_secondary")
        .with_magnitude(
            Attribute::MaxHealth,
            ModifierOp::Override,
            Magnitude::AttributeBased(self_based(Attribute::Vigor).with_coefficient(10.0).with_post_add(50.0)),
        )
        .with_magnitude(
            Attribute::MaxMana,
            ModifierOp::Override,
            Magnitude::AttributeBased(self_based(Attribute::Intelligence).with_coefficient(5.0)),
        );
    let vital = EffectDefinition::instant("init_vital")
        .with_magnitude(
            Attribute::Health,
            ModifierOp::Override,
            Magnitude::AttributeBased(self_based(Attribute::MaxHealth)),
        )
        .with_magnitude(
            Attribute::Mana,
            ModifierOp::Override,
            Magnitude::AttributeBased(self_based(Attribute::MaxMana)),
        );
    let initializer = AttributeInitializer::new(Arc::new(primary), Arc::new(secondary), Arc::new(vital));

    let mut world = StatWorld::default();
    let hero = world.spawn_standard();
    initializer.initialize(&mut world, hero).expect("hero is alive");

    assert_eq!(world.current(hero, Attribute::MaxHealth), Some(150.0));
    assert_eq!(world.current(hero, Attribute::Health), Some(150.0));
    assert_eq!(world.current(hero, Attribute::MaxMana), Some(60.0));
    assert_eq!(world.current(hero, Attribute::Mana), Some(60.0));
}
