//! Entity registry and effect routing.
//!
//! [`StatWorld`] owns every entity's [`ActorStats`]. Entities are referred to
//! by a stable [`EntityId`]; a destroyed entity simply stops resolving, and
//! every active effect on it goes with it. Handles are routed back to the
//! entity they were applied to, so callers only need the handle to remove or
//! tick an effect.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::actor::{ActorStats, StatsEnv};
use crate::attribute::{Attribute, RoundingPolicy};
use crate::config::EngineConfig;
use crate::effect::{
    ActiveEffect, ActiveEffectHandle, EffectContext, EffectDefinition, EffectSpec, HandleAllocator,
    StacksToRemove,
};
use crate::error::EffectError;
use crate::hooks::HookRegistry;
use crate::magnitude::{CalculatorRegistry, CaptureSide};
use crate::store::{AttributeChange, ChangeCallback, SubscriptionToken};

/// Stable identifier of an entity with a stat block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u32);

impl EntityId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// All stat blocks, plus the shared registries effects are built against.
#[derive(Debug)]
pub struct StatWorld {
    config: EngineConfig,
    calculators: CalculatorRegistry,
    hooks: HookRegistry,
    actors: HashMap<EntityId, ActorStats>,
    handle_owners: HashMap<ActiveEffectHandle, EntityId>,
    handles: HandleAllocator,
    next_entity: u32,
}

impl Default for StatWorld {
    fn default() -> Self {
        Self::new(EngineConfig::default(), CalculatorRegistry::new())
    }
}

impl StatWorld {
    pub fn new(config: EngineConfig, calculators: CalculatorRegistry) -> Self {
        Self {
            config,
            calculators,
            hooks: HookRegistry::default(),
            actors: HashMap::new(),
            handle_owners: HashMap::new(),
            handles: HandleAllocator::new(),
            next_entity: 1,
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calculators(&self) -> &CalculatorRegistry {
        &self.calculators
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Creates an entity with an empty stat block and no pairs.
    pub fn spawn(&mut self) -> EntityId {
        let entity = EntityId(self.next_entity);
        self.next_entity += 1;
        self.actors.insert(entity, ActorStats::new(entity, &self.config));
        debug!(%entity, "spawned stat block");
        entity
    }

    /// Creates an entity with the standard Health/Mana/Stamina pairs.
    pub fn spawn_standard(&mut self) -> EntityId {
        let entity = self.spawn();
        let env = StatsEnv::new(&self.config, &self.hooks);
        if let Some(actor) = self.actors.get_mut(&entity) {
            actor.register_standard_pairs(env);
        }
        entity
    }

    /// Drops an entity's stat block and every handle applied to it.
    pub fn destroy(&mut self, entity: EntityId) -> bool {
        let Some(actor) = self.actors.remove(&entity) else {
            return false;
        };
        self.handle_owners.retain(|_, owner| *owner != entity);
        debug!(%entity, effects = actor.effects().len(), "destroyed stat block");
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.actors.contains_key(&entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.actors.keys().copied()
    }

    pub fn actor(&self, entity: EntityId) -> Option<&ActorStats> {
        self.actors.get(&entity)
    }

    fn actor_mut(&mut self, entity: EntityId) -> Result<(&mut ActorStats, StatsEnv<'_>), EffectError> {
        let actor = self
            .actors
            .get_mut(&entity)
            .ok_or(EffectError::InvalidTarget { entity })?;
        Ok((actor, StatsEnv::new(&self.config, &self.hooks)))
    }

    // ========================================================================
    // Attribute access
    // ========================================================================

    pub fn current(&self, entity: EntityId, attribute: Attribute) -> Option<f32> {
        self.actor(entity).map(|actor| actor.current(attribute))
    }

    pub fn base(&self, entity: EntityId, attribute: Attribute) -> Option<f32> {
        self.actor(entity).map(|actor| actor.base(attribute))
    }

    /// Sets base and current directly, for building a stat block by hand.
    pub fn init_attribute(&mut self, entity: EntityId, attribute: Attribute, value: f32) -> Result<(), EffectError> {
        let (actor, env) = self.actor_mut(entity)?;
        actor.init(env, attribute, value);
        Ok(())
    }

    /// Writes a base value through the clamp checkpoints.
    pub fn set_base(
        &mut self,
        entity: EntityId,
        attribute: Attribute,
        value: f32,
    ) -> Result<Vec<AttributeChange>, EffectError> {
        let (actor, env) = self.actor_mut(entity)?;
        Ok(actor.set_base(env, attribute, value))
    }

    pub fn register_pair(&mut self, entity: EntityId, current: Attribute, max: Attribute) -> Result<(), EffectError> {
        let (actor, env) = self.actor_mut(entity)?;
        actor.register_pair(env, current, max);
        Ok(())
    }

    pub fn set_rounding_policy(
        &mut self,
        entity: EntityId,
        attribute: Attribute,
        policy: RoundingPolicy,
    ) -> Result<(), EffectError> {
        let (actor, env) = self.actor_mut(entity)?;
        actor.set_rounding_policy(env, attribute, policy);
        Ok(())
    }

    pub fn subscribe(
        &mut self,
        entity: EntityId,
        attribute: Attribute,
        callback: ChangeCallback,
    ) -> Result<SubscriptionToken, EffectError> {
        let (actor, _) = self.actor_mut(entity)?;
        Ok(actor.subscribe(attribute, callback))
    }

    pub fn unsubscribe(&mut self, entity: EntityId, token: SubscriptionToken) -> bool {
        self.actors
            .get_mut(&entity)
            .is_some_and(|actor| actor.unsubscribe(token))
    }

    // ========================================================================
    // Effects
    // ========================================================================

    /// Builds a spec and records source-side captures from the instigator.
    ///
    /// A missing instigator leaves its captures unset; they read as `0`.
    pub fn make_spec(
        &self,
        definition: Arc<EffectDefinition>,
        level: f32,
        context: EffectContext,
    ) -> Result<EffectSpec, EffectError> {
        let mut spec = EffectSpec::new(definition, level, context, &self.calculators)?;

        if let Some(source) = spec.context().instigator.and_then(|id| self.actor(id)) {
            let captured: Vec<_> = spec
                .captures()
                .into_iter()
                .filter(|capture| capture.side == CaptureSide::Source)
                .map(|capture| (capture, source.current(capture.attribute)))
                .collect();
            for (capture, value) in captured {
                spec.set_captured(capture, value);
            }
        }

        Ok(spec)
    }

    /// Applies a spec to `target`.
    ///
    /// Returns the handle of a non-instant effect, `None` for Instant specs,
    /// and `InvalidTarget` if the target has no stat block.
    pub fn apply_spec(&mut self, mut spec: EffectSpec, target: EntityId) -> Result<Option<ActiveEffectHandle>, EffectError> {
        let actor = self
            .actors
            .get_mut(&target)
            .ok_or(EffectError::InvalidTarget { entity: target })?;

        spec.set_target(target);
        let snapshots: Vec<_> = spec
            .captures()
            .into_iter()
            .filter(|capture| capture.side == CaptureSide::Target && capture.snapshot)
            .map(|capture| (capture, actor.current(capture.attribute)))
            .collect();
        for (capture, value) in snapshots {
            spec.set_captured(capture, value);
        }

        let env = StatsEnv::new(&self.config, &self.hooks);
        let handle = actor.apply(env, Arc::new(spec), &mut self.handles);
        if let Some(handle) = handle {
            self.handle_owners.insert(handle, target);
        }
        Ok(handle)
    }

    /// `make_spec` followed by `apply_spec`.
    pub fn apply_effect(
        &mut self,
        definition: Arc<EffectDefinition>,
        level: f32,
        context: EffectContext,
        target: EntityId,
    ) -> Result<Option<ActiveEffectHandle>, EffectError> {
        if !self.is_alive(target) {
            return Err(EffectError::InvalidTarget { entity: target });
        }
        let spec = self.make_spec(definition, level, context)?;
        self.apply_spec(spec, target)
    }

    /// Removes stacks from an active effect. Returns the number removed,
    /// `0` for unknown or stale handles.
    pub fn remove_by_handle(&mut self, handle: ActiveEffectHandle, stacks: StacksToRemove) -> u32 {
        let Some(&owner) = self.handle_owners.get(&handle) else {
            return 0;
        };
        let Some(actor) = self.actors.get_mut(&owner) else {
            self.handle_owners.remove(&handle);
            return 0;
        };

        let env = StatsEnv::new(&self.config, &self.hooks);
        let removed = actor.remove(env, handle, stacks);
        if !actor.effects().contains(handle) {
            self.handle_owners.remove(&handle);
        }
        removed
    }

    /// Runs one period of a periodic effect.
    pub fn execute_periodic(&mut self, handle: ActiveEffectHandle) -> Result<Vec<AttributeChange>, EffectError> {
        let owner = *self
            .handle_owners
            .get(&handle)
            .ok_or(EffectError::StaleHandle(handle))?;
        let actor = self
            .actors
            .get_mut(&owner)
            .ok_or(EffectError::StaleHandle(handle))?;
        let env = StatsEnv::new(&self.config, &self.hooks);
        actor.execute_periodic(env, handle)
    }

    /// Entity a live handle was applied to.
    pub fn handle_target(&self, handle: ActiveEffectHandle) -> Option<EntityId> {
        self.handle_owners.get(&handle).copied()
    }

    pub fn active_effect(&self, handle: ActiveEffectHandle) -> Option<&ActiveEffect> {
        let owner = self.handle_target(handle)?;
        self.actor(owner)?.effects().get(handle)
    }

    pub fn has_active_effect(&self, handle: ActiveEffectHandle) -> bool {
        self.active_effect(handle).is_some()
    }
}
