//! Per-entity stat block: attribute store, active effects, owned tags and
//! change observers, plus the mutation pathways that keep them consistent.
//!
//! # Pathways
//!
//! ```text
//! Instant / Periodic:   pre_base_change → [base written] → refresh → post_effect_execute
//! Duration / Infinite:  [effect inserted or removed] → refresh
//! ```
//!
//! `refresh` re-aggregates an attribute from its base and the active
//! modifiers, runs `pre_change`, writes the current value, and then follows
//! what the write affects: the paired current of a maximum, and active
//! effects whose magnitudes capture the attribute live.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::attribute::{Attribute, RoundingPolicy, nearly_equal};
use crate::config::EngineConfig;
use crate::effect::{
    ActiveEffect, ActiveEffectHandle, ActiveEffects, EffectSpec, HandleAllocator, ModifierOp,
    StacksToRemove,
};
use crate::error::EffectError;
use crate::hooks::{ClampEvent, ExecuteEvent, HookRegistry, MaxClampEvent};
use crate::magnitude::CaptureReader;
use crate::store::{AttributeChange, AttributeStore, ChangeCallback, ChangeObservers, SubscriptionToken};
use crate::tags::{GameplayTag, TagContainer};
use crate::world::EntityId;

/// Shared, read-only inputs to every mutation.
#[derive(Clone, Copy, Debug)]
pub struct StatsEnv<'a> {
    pub config: &'a EngineConfig,
    pub hooks: &'a HookRegistry,
}

impl<'a> StatsEnv<'a> {
    pub fn new(config: &'a EngineConfig, hooks: &'a HookRegistry) -> Self {
        Self { config, hooks }
    }
}

/// Evaluates every modifier magnitude of `spec` against `store`.
fn evaluate_magnitudes(spec: &EffectSpec, entity: EntityId, store: &AttributeStore) -> Vec<f32> {
    let reader = CaptureReader::new(spec, Some((entity, store)));
    spec.modifiers()
        .iter()
        .map(|modifier| sanitize(spec, modifier.magnitude.evaluate(spec, &reader)))
        .collect()
}

fn sanitize(spec: &EffectSpec, value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        warn!(effect = %spec.definition().id, value, "non-finite magnitude treated as 0");
        0.0
    }
}

fn stack_exponent(stacks: u32) -> i32 {
    i32::try_from(stacks).unwrap_or(i32::MAX)
}

fn enqueue(queue: &mut VecDeque<Attribute>, attribute: Attribute) {
    if !queue.contains(&attribute) {
        queue.push_back(attribute);
    }
}

/// Stat block of one entity.
#[derive(Debug)]
pub struct ActorStats {
    entity: EntityId,
    store: AttributeStore,
    effects: ActiveEffects,
    tags: TagContainer,
    observers: ChangeObservers,
}

impl ActorStats {
    pub fn new(entity: EntityId, config: &EngineConfig) -> Self {
        Self {
            entity,
            store: AttributeStore::new(config.default_rounding),
            effects: ActiveEffects::new(),
            tags: TagContainer::new(),
            observers: ChangeObservers::new(),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    pub fn current(&self, attribute: Attribute) -> f32 {
        self.store.current(attribute)
    }

    pub fn base(&self, attribute: Attribute) -> f32 {
        self.store.base(attribute)
    }

    pub fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    pub fn tags(&self) -> &TagContainer {
        &self.tags
    }

    /// Base folded with every satisfied, non-periodic active modifier.
    ///
    /// Add and Multiply apply in application order, each feeding the next.
    /// The most recently applied satisfied Override replaces the result.
    pub fn aggregate(&self, attribute: Attribute) -> f32 {
        let mut value = self.store.base(attribute);
        let mut overridden = None;

        for active in self.effects.iter().filter(|active| !active.is_periodic()) {
            let stacks = active.stacks();
            let modifiers = active.spec().modifiers().iter().zip(active.magnitudes());
            for (modifier, magnitude) in modifiers {
                if modifier.attribute != attribute
                    || !modifier.requirements.is_satisfied_by(&self.tags)
                {
                    continue;
                }
                match modifier.op {
                    ModifierOp::Add => value += magnitude * stacks as f32,
                    ModifierOp::Multiply => value *= magnitude.powi(stack_exponent(stacks)),
                    ModifierOp::Override => overridden = Some(*magnitude),
                }
            }
        }

        overridden.unwrap_or(value)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Sets base and current of an attribute, rounded, then re-evaluates it
    /// against any active modifiers.
    pub fn init(&mut self, env: StatsEnv<'_>, attribute: Attribute, value: f32) -> Vec<AttributeChange> {
        self.store.init(attribute, value);
        self.refresh(env, [attribute])
    }

    /// Registers a pair and immediately enforces the new bound.
    pub fn register_pair(&mut self, env: StatsEnv<'_>, current: Attribute, max: Attribute) -> Vec<AttributeChange> {
        if self.store.register_pair(current, max) {
            self.refresh(env, [current])
        } else {
            Vec::new()
        }
    }

    pub fn register_standard_pairs(&mut self, env: StatsEnv<'_>) {
        for (current, max) in Attribute::STANDARD_PAIRS {
            self.register_pair(env, current, max);
        }
    }

    pub fn set_rounding_policy(
        &mut self,
        env: StatsEnv<'_>,
        attribute: Attribute,
        policy: RoundingPolicy,
    ) -> Vec<AttributeChange> {
        self.store.set_rounding_policy(attribute, policy);
        self.refresh(env, [attribute])
    }

    pub fn subscribe(&mut self, attribute: Attribute, callback: ChangeCallback) -> SubscriptionToken {
        self.observers.subscribe(attribute, callback)
    }

    pub fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        self.observers.unsubscribe(token)
    }

    // ========================================================================
    // Recompute
    // ========================================================================

    /// Re-evaluates `seeds` and everything their changes affect.
    ///
    /// Returns every current-value write in order. An attribute evaluated
    /// more than `max_recompute_depth` times in one call is left as is.
    pub fn refresh(
        &mut self,
        env: StatsEnv<'_>,
        seeds: impl IntoIterator<Item = Attribute>,
    ) -> Vec<AttributeChange> {
        let mut queue = VecDeque::new();
        for seed in seeds {
            enqueue(&mut queue, seed);
        }

        let mut visits = [0u32; Attribute::COUNT];
        let mut changes = Vec::new();

        while let Some(attribute) = queue.pop_front() {
            let visit = &mut visits[attribute.index()];
            *visit += 1;
            if *visit > env.config.max_recompute_depth {
                if *visit == env.config.max_recompute_depth + 1 {
                    warn!(
                        entity = %self.entity,
                        %attribute,
                        depth = env.config.max_recompute_depth,
                        "recompute depth exceeded; check for capture cycles"
                    );
                }
                continue;
            }

            let proposed = self.aggregate(attribute);
            let clamped = self.store.pre_change(attribute, proposed);
            let old_value = self.store.current(attribute);
            if nearly_equal(old_value, clamped.value) {
                continue;
            }

            self.store.write_current(attribute, clamped.value);
            trace!(
                entity = %self.entity,
                %attribute,
                proposed,
                old_value,
                new_value = clamped.value,
                "current updated"
            );

            let change = AttributeChange {
                entity: self.entity,
                attribute,
                old_value,
                new_value: clamped.value,
            };
            self.observers.notify(&change);
            changes.push(change);

            if clamped.bounded_by_max.is_some() {
                if let Some(max) = self.store.pairs().max_of(attribute) {
                    env.hooks.current_clamped_by_max(&ClampEvent {
                        entity: self.entity,
                        current: attribute,
                        max,
                        old_value,
                        new_value: clamped.value,
                    });
                }
            }

            if let Some(current) = self.store.pairs().current_of(attribute) {
                enqueue(&mut queue, current);
            }

            for handle in self.effects.live_dependents(attribute, self.entity) {
                let Some(spec) = self.effects.get(handle).map(|active| Arc::clone(active.spec())) else {
                    continue;
                };
                let magnitudes = evaluate_magnitudes(&spec, self.entity, &self.store);
                if let Some(active) = self.effects.get_mut(handle) {
                    for moved in active.update_magnitudes(magnitudes) {
                        enqueue(&mut queue, moved);
                    }
                }
            }
        }

        changes
    }

    // ========================================================================
    // Instant / Periodic pathway
    // ========================================================================

    /// Writes a base value through `pre_base_change`, outside any effect.
    pub fn set_base(&mut self, env: StatsEnv<'_>, attribute: Attribute, value: f32) -> Vec<AttributeChange> {
        let mut changes = self.write_base_checked(env, attribute, value);
        self.clamp_after_execution(env, &mut changes);
        changes
    }

    fn write_base_checked(&mut self, env: StatsEnv<'_>, attribute: Attribute, proposed: f32) -> Vec<AttributeChange> {
        let new_base = self.store.pre_base_change(attribute, proposed);
        let old_base = self.store.write_base(attribute, new_base);
        trace!(
            entity = %self.entity,
            %attribute,
            proposed,
            old_base,
            new_base,
            "base updated"
        );
        self.refresh(env, [attribute])
    }

    /// Runs `post_effect_execute` for every registered pair. A base written
    /// under a since-removed max buff is pulled down here too.
    fn clamp_after_execution(&mut self, env: StatsEnv<'_>, changes: &mut Vec<AttributeChange>) {
        let maxima: Vec<_> = self.store.pairs().iter().map(|(_, max)| max).collect();

        for max in maxima {
            let Some(correction) = self.store.post_effect_execute(max) else {
                continue;
            };
            let refreshed = self.refresh(env, [correction.current]);
            env.hooks.max_changed_and_clamped(&MaxClampEvent {
                entity: self.entity,
                current: correction.current,
                max,
                old_base: correction.old_base,
                new_base: correction.new_base,
            });
            changes.extend(refreshed);
        }
    }

    /// Executes `spec` against base values. Modifiers run in list order,
    /// each seeing the result of the previous one.
    pub fn execute_instant(&mut self, env: StatsEnv<'_>, spec: &EffectSpec, stacks: u32) -> Vec<AttributeChange> {
        let mut changes = Vec::new();

        for modifier in spec.modifiers() {
            if !modifier.requirements.is_satisfied_by(&self.tags) {
                continue;
            }

            let magnitude = {
                let reader = CaptureReader::new(spec, Some((self.entity, &self.store)));
                sanitize(spec, modifier.magnitude.evaluate(spec, &reader))
            };
            let base = self.store.base(modifier.attribute);
            let proposed = match modifier.op {
                ModifierOp::Add => base + magnitude * stacks as f32,
                ModifierOp::Multiply => base * magnitude.powi(stack_exponent(stacks)),
                ModifierOp::Override => magnitude,
            };

            changes.extend(self.write_base_checked(env, modifier.attribute, proposed));
        }

        self.clamp_after_execution(env, &mut changes);

        debug!(
            entity = %self.entity,
            effect = %spec.definition().id,
            changes = changes.len(),
            "executed effect"
        );
        env.hooks.post_execute(&ExecuteEvent {
            entity: self.entity,
            effect: &spec.definition().id,
            changes: &changes,
        });
        changes
    }

    /// Runs one period of a periodic active effect.
    pub fn execute_periodic(
        &mut self,
        env: StatsEnv<'_>,
        handle: ActiveEffectHandle,
    ) -> Result<Vec<AttributeChange>, EffectError> {
        let active = self
            .effects
            .get(handle)
            .ok_or(EffectError::StaleHandle(handle))?;
        if !active.is_periodic() {
            return Err(EffectError::invalid_spec(
                active.definition().id.as_str(),
                "effect is not periodic",
            ));
        }

        let spec = Arc::clone(active.spec());
        let stacks = active.stacks();
        Ok(self.execute_instant(env, &spec, stacks))
    }

    // ========================================================================
    // Duration / Infinite pathway
    // ========================================================================

    /// Applies a spec. Instant specs execute and return `None`; others
    /// return the handle of the new or stacked instance.
    pub fn apply(
        &mut self,
        env: StatsEnv<'_>,
        spec: Arc<EffectSpec>,
        handles: &mut HandleAllocator,
    ) -> Option<ActiveEffectHandle> {
        let definition = Arc::clone(spec.definition());
        if definition.duration.is_instant() {
            self.execute_instant(env, &spec, 1);
            return None;
        }

        if let Some(stacking) = definition.stacking {
            if let Some(handle) = self.effects.find_stackable(&definition.id, spec.context()) {
                self.add_stack(env, handle, stacking.limit);
                return Some(handle);
            }
        }

        let handle = handles.allocate();
        let magnitudes = evaluate_magnitudes(&spec, self.entity, &self.store);
        let active = ActiveEffect::new(handle, Arc::clone(&spec), magnitudes);
        let mut seeds = active.aggregated_attributes();
        self.effects.insert(active);

        if self.grant_tags(&definition.granted_tags) {
            seeds.extend(self.effects.gated_attributes());
        }

        debug!(
            entity = %self.entity,
            effect = %definition.id,
            %handle,
            "applied effect"
        );
        self.refresh(env, seeds);

        if definition.is_periodic() && definition.execute_on_application {
            self.execute_instant(env, &spec, 1);
        }

        Some(handle)
    }

    fn add_stack(&mut self, env: StatsEnv<'_>, handle: ActiveEffectHandle, limit: Option<u32>) {
        let Some(active) = self.effects.get_mut(handle) else {
            return;
        };

        let stacks = active.stacks();
        if !limit.is_none_or(|limit| stacks < limit) {
            debug!(entity = %self.entity, %handle, stacks, "stack limit reached");
            return;
        }

        active.set_stacks(stacks + 1);
        let seeds = active.aggregated_attributes();
        debug!(entity = %self.entity, %handle, stacks = stacks + 1, "added stack");
        self.refresh(env, seeds);
    }

    /// Removes up to `stacks` stacks from an active effect.
    ///
    /// Returns the number of stacks removed; `0` when the handle is not
    /// active on this entity.
    pub fn remove(&mut self, env: StatsEnv<'_>, handle: ActiveEffectHandle, stacks: StacksToRemove) -> u32 {
        let Some(active) = self.effects.get_mut(handle) else {
            return 0;
        };

        let held = active.stacks();
        let removed = stacks.resolve(held);
        if removed == 0 {
            return 0;
        }

        let mut seeds = active.aggregated_attributes();
        let remaining = held - removed;
        if remaining > 0 {
            active.set_stacks(remaining);
        } else if let Some(active) = self.effects.remove(handle) {
            if self.revoke_tags(&active.definition().granted_tags) {
                seeds.extend(self.effects.gated_attributes());
            }
        }

        debug!(
            entity = %self.entity,
            %handle,
            removed,
            remaining,
            "removed effect stacks"
        );
        self.refresh(env, seeds);
        removed
    }

    /// Adds granted tags; true if the owned set changed.
    fn grant_tags(&mut self, tags: &[GameplayTag]) -> bool {
        tags.iter().fold(false, |changed, tag| self.tags.add(tag) | changed)
    }

    /// Drops granted tags; true if the owned set changed.
    fn revoke_tags(&mut self, tags: &[GameplayTag]) -> bool {
        tags.iter().fold(false, |changed, tag| self.tags.remove(tag) | changed)
    }
}
