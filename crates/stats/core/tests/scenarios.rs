use std::sync::Arc;

use stats_core::{
    Attribute, AttributeCapture, CalculatorRegistry, EffectCatalog, EffectContext,
    EffectDefinition, EffectRow, EffectSource, EngineConfig, EntityId, LinearCalculation,
    Magnitude, ModifierOp, ScalableFloat, StackingPolicy, StatWorld, StacksToRemove, Trigger,
};

fn world_with_health(max: f32, current: f32) -> (StatWorld, EntityId) {
    let mut world = StatWorld::default();
    let hero = world.spawn_standard();
    world.init_attribute(hero, Attribute::MaxHealth, max).expect("hero is alive");
    world.init_attribute(hero, Attribute::Health, current).expect("hero is alive");
    (world, hero)
}

/// Scenario A: an overheal held by a Duration effect is clamped while active
/// and leaves no trace once removed.
#[test]
fn duration_overheal_clamps_and_reverts_exactly() {
    let (mut world, hero) = world_with_health(100.0, 90.0);
    let blessing = Arc::new(
        EffectDefinition::duration("blessing", 10.0).with_modifier(Attribute::Health, ModifierOp::Add, 100.0),
    );

    let handle = world
        .apply_effect(blessing, 1.0, EffectContext::new(), hero)
        .expect("hero is alive")
        .expect("duration effects return a handle");
    assert_eq!(world.current(hero, Attribute::Health), Some(100.0));
    assert_eq!(world.base(hero, Attribute::Health), Some(90.0));

    assert_eq!(world.remove_by_handle(handle, StacksToRemove::All), 1);
    assert_eq!(world.current(hero, Attribute::Health), Some(90.0));
    assert_eq!(world.base(hero, Attribute::Health), Some(90.0));
}

/// Scenario B: a linear calculator rounds its raw result half to even.
#[test]
fn linear_calculation_rounds_half_to_even() {
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

    let derive = Arc::new(EffectDefinition::instant("derive_stamina").with_magnitude(
        Attribute::MaxStamina,
        ModifierOp::Override,
        Magnitude::Custom("max_stamina".into()),
    ));
    world
        .apply_effect(derive, 1.0, EffectContext::new(), hero)
        .expect("hero is alive");

    // 80 + 2.5 × 9 + 10 × 1 = 112.5
    assert_eq!(world.base(hero, Attribute::MaxStamina), Some(112.0));
    assert_eq!(world.current(hero, Attribute::MaxStamina), Some(112.0));
}

/// Scenario C: two rows naming one stacking Infinite effect share a single
/// tracked handle, and one removal takes every stack off it.
#[test]
fn duplicate_infinite_rows_remove_every_stack_under_one_handle() {
    let catalog = EffectCatalog::from_definitions([EffectDefinition::infinite("burning")
        .with_modifier(Attribute::Armor, ModifierOp::Add, -2.0)
        .with_stacking(None)])
    .expect("valid definitions");
    let rows = vec![
        EffectRow::new("burning")
            .applied_on(Trigger::OnEnter)
            .removed_on(Trigger::OnExit)
            .removing(StacksToRemove::from(-1)),
        EffectRow::new("burning")
            .applied_on(Trigger::OnEnter)
            .removed_on(Trigger::OnExit)
            .removing(StacksToRemove::from(-1)),
    ];
    let mut source = EffectSource::new("fire_area", rows, &catalog);
    assert_eq!(source.diagnostics().len(), 1, "duplicate Infinite rows are flagged");

    let mut world = StatWorld::default();
    let hero = world.spawn_standard();

    source.on_trigger_enter(&mut world, hero);
    assert_eq!(source.tracked().len(), 1);
    let (handle, _) = source.tracked().iter().next().expect("one tracked handle");
    assert_eq!(world.active_effect(handle).map(|active| active.stacks()), Some(2));
    assert_eq!(world.current(hero, Attribute::Armor), Some(-4.0));

    assert_eq!(source.remove_from_target(&mut world, hero, 0), 2);
    assert_eq!(source.remove_from_target(&mut world, hero, 1), 0);
    assert!(!world.has_active_effect(handle));
    assert!(source.tracked().is_empty());
    assert_eq!(world.current(hero, Attribute::Armor), Some(0.0));
}

#[test]
fn stacking_policy_limit_caps_stacks_from_one_source() {
    let catalog = EffectCatalog::from_definitions([EffectDefinition::infinite("bleed")
        .with_modifier(Attribute::HealthRegeneration, ModifierOp::Add, -1.0)
        .with_stacking(Some(2))])
    .expect("valid definitions");
    assert_eq!(
        catalog.get(&"bleed".into()).and_then(|d| d.stacking),
        Some(StackingPolicy { limit: Some(2) })
    );

    let rows = vec![EffectRow::new("bleed").applied_on(Trigger::OnEnter).removed_on(Trigger::OnExit)];
    let mut source = EffectSource::new("thorns", rows, &catalog);
    let mut world = StatWorld::default();
    let hero = world.spawn_standard();

    for _ in 0..3 {
        source.on_trigger_enter(&mut world, hero);
    }
    assert_eq!(world.current(hero, Attribute::HealthRegeneration), Some(-2.0));

    source.on_trigger_exit(&mut world, hero);
    assert_eq!(world.current(hero, Attribute::HealthRegeneration), Some(0.0));
}

/// Scenario D: a target destroyed while holding a tracked effect is pruned
/// quietly and never counts as a successful removal.
#[test]
fn destroyed_target_is_pruned_without_destroy_on_removal() {
    let catalog = EffectCatalog::from_definitions([
        EffectDefinition::infinite("burning").with_modifier(Attribute::Armor, ModifierOp::Add, -2.0),
    ])
    .expect("valid definitions");
    let rows = vec![
        EffectRow::new("burning")
            .applied_on(Trigger::OnEnter)
            .removed_on(Trigger::OnExit)
            .destroying_on_removal(),
    ];
    let mut source = EffectSource::new("fire_area", rows, &catalog);

    let mut world = StatWorld::default();
    let hero = world.spawn_standard();
    source.on_trigger_enter(&mut world, hero);
    assert_eq!(source.tracked().len(), 1);

    assert!(world.destroy(hero));
    source.on_trigger_exit(&mut world, hero);

    assert!(source.tracked().is_empty());
    assert!(!source.is_destroyed());
    assert_eq!(source.remove_from_target(&mut world, hero, 0), 0);
}

#[test]
fn successful_removal_destroys_source_when_configured() {
    let catalog = EffectCatalog::from_definitions([
        EffectDefinition::infinite("burning").with_modifier(Attribute::Armor, ModifierOp::Add, -2.0),
    ])
    .expect("valid definitions");
    let rows = vec![
        EffectRow::new("burning")
            .applied_on(Trigger::OnEnter)
            .removed_on(Trigger::OnExit)
            .destroying_on_removal(),
    ];
    let mut source = EffectSource::new("fire_area", rows, &catalog);

    let mut world = StatWorld::default();
    let hero = world.spawn_standard();
    source.on_trigger_enter(&mut world, hero);
    source.on_trigger_exit(&mut world, hero);

    assert!(source.is_destroyed());
    assert_eq!(world.current(hero, Attribute::Armor), Some(0.0));
}

#[test]
fn removal_only_touches_the_sources_own_handles() {
    let catalog = EffectCatalog::from_definitions([
        EffectDefinition::infinite("burning").with_modifier(Attribute::Armor, ModifierOp::Add, -2.0),
    ])
    .expect("valid definitions");
    let row = || {
        EffectRow::new("burning")
            .applied_on(Trigger::OnEnter)
            .removed_on(Trigger::OnExit)
    };
    let mut left = EffectSource::new("left_brazier", vec![row()], &catalog);
    let mut right = EffectSource::new("right_brazier", vec![row()], &catalog);

    let mut world = StatWorld::default();
    let hero = world.spawn_standard();
    left.on_trigger_enter(&mut world, hero);
    right.on_trigger_enter(&mut world, hero);
    assert_eq!(world.current(hero, Attribute::Armor), Some(-4.0));

    left.on_trigger_exit(&mut world, hero);
    assert_eq!(world.current(hero, Attribute::Armor), Some(-2.0));
    assert_eq!(right.tracked().len(), 1);
}

#[test]
fn row_level_scales_the_applied_magnitude() {
    let catalog = EffectCatalog::from_definitions([EffectDefinition::instant("mend").with_magnitude(
        Attribute::Health,
        ModifierOp::Add,
        Magnitude::Scalable(ScalableFloat::new(10.0, 5.0)),
    )])
    .expect("valid definitions");
    let rows = vec![
        EffectRow::new("mend").applied_on(Trigger::Manual),
        EffectRow::new("mend").applied_on(Trigger::Manual).at_level(5.0),
    ];
    let mut shrine = EffectSource::new("healing_shrine", rows, &catalog);
    let (mut world, hero) = world_with_health(100.0, 20.0);

    shrine.apply_to_target(&mut world, hero, 0).expect("hero is alive");
    assert_eq!(world.current(hero, Attribute::Health), Some(30.0));

    // 10 + 5 × (5 - 1)
    shrine.apply_to_target(&mut world, hero, 1).expect("hero is alive");
    assert_eq!(world.current(hero, Attribute::Health), Some(60.0));
}

#[test]
fn row_level_feeds_calculators_without_a_source_object() {
    let calculators = CalculatorRegistry::new().with(
        LinearCalculation::new("max_stamina")
            .with_capture(AttributeCapture::target(Attribute::Endurance))
            .with_base(80.0)
            .with_attribute_multiplier(2.5)
            .with_level_multiplier(10.0),
    );
    let catalog = EffectCatalog::from_definitions([EffectDefinition::instant("derive_stamina").with_magnitude(
        Attribute::MaxStamina,
        ModifierOp::Override,
        Magnitude::Custom("max_stamina".into()),
    )])
    .expect("valid definitions");
    let mut world = StatWorld::new(EngineConfig::default(), calculators);
    let hero = world.spawn_standard();
    world.init_attribute(hero, Attribute::Endurance, 10.0).expect("hero is alive");

    let rows = vec![EffectRow::new("derive_stamina").applied_on(Trigger::Manual).at_level(5.0)];
    let mut trainer = EffectSource::new("trainer", rows, &catalog);
    trainer.apply_to_target(&mut world, hero, 0).expect("hero is alive");

    // 80 + 2.5 × 10 + 10 × 5
    assert_eq!(world.base(hero, Attribute::MaxStamina), Some(155.0));
}

#[test]
fn sources_without_an_instigator_keep_separate_stacks() {
    let catalog = EffectCatalog::from_definitions([EffectDefinition::infinite("burning")
        .with_modifier(Attribute::Armor, ModifierOp::Add, -2.0)
        .with_stacking(None)])
    .expect("valid definitions");
    let row = || {
        EffectRow::new("burning")
            .applied_on(Trigger::OnEnter)
            .removed_on(Trigger::OnExit)
            .removing(StacksToRemove::All)
    };
    let mut lava = EffectSource::new("lava_pool", vec![row()], &catalog);
    let mut brazier = EffectSource::new("brazier", vec![row()], &catalog);

    let mut world = StatWorld::default();
    let hero = world.spawn_standard();
    lava.on_trigger_enter(&mut world, hero);
    brazier.on_trigger_enter(&mut world, hero);
    assert_eq!(world.current(hero, Attribute::Armor), Some(-4.0));

    let (lava_handle, _) = lava.tracked().iter().next().expect("lava is tracked");
    let (brazier_handle, _) = brazier.tracked().iter().next().expect("brazier is tracked");
    assert_ne!(lava_handle, brazier_handle);

    lava.on_trigger_exit(&mut world, hero);
    assert_eq!(world.current(hero, Attribute::Armor), Some(-2.0));
    assert_eq!(world.active_effect(brazier_handle).map(|active| active.stacks()), Some(1));
}
