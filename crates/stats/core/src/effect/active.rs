//! Active (Duration/Infinite) effects on one entity.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::attribute::Attribute;
use crate::world::EntityId;

use super::definition::{EffectDefinition, EffectId};
use super::spec::{EffectContext, EffectSpec};

/// Opaque id of one applied non-instant effect instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveEffectHandle(u64);

impl ActiveEffectHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActiveEffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Monotonic handle source. Handles are never reused, so a later handle was
/// always applied later.
#[derive(Clone, Debug)]
pub struct HandleAllocator {
    next: u64,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ActiveEffectHandle {
        let handle = ActiveEffectHandle(self.next);
        self.next += 1;
        handle
    }
}

/// How many stacks a removal takes off.
///
/// Authored as an integer where `-1` (any value ≤ 0) means all stacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "i32", into = "i32"))]
pub enum StacksToRemove {
    #[default]
    All,
    Count(u32),
}

impl StacksToRemove {
    /// Stacks actually removed from an instance holding `stacks`.
    pub fn resolve(self, stacks: u32) -> u32 {
        match self {
            Self::All => stacks,
            Self::Count(count) => count.min(stacks),
        }
    }
}

impl From<i32> for StacksToRemove {
    fn from(value: i32) -> Self {
        match u32::try_from(value) {
            Ok(count) if count > 0 => Self::Count(count),
            _ => Self::All,
        }
    }
}

impl From<StacksToRemove> for i32 {
    fn from(value: StacksToRemove) -> Self {
        match value {
            StacksToRemove::All => -1,
            StacksToRemove::Count(count) => i32::try_from(count).unwrap_or(i32::MAX),
        }
    }
}

/// One applied Duration/Infinite effect and its cached magnitudes.
#[derive(Clone, Debug)]
pub struct ActiveEffect {
    handle: ActiveEffectHandle,
    spec: Arc<EffectSpec>,
    stacks: u32,
    /// One value per spec modifier, evaluated at application and whenever a
    /// live captured attribute changes.
    magnitudes: Vec<f32>,
}

impl ActiveEffect {
    pub(crate) fn new(handle: ActiveEffectHandle, spec: Arc<EffectSpec>, magnitudes: Vec<f32>) -> Self {
        Self {
            handle,
            spec,
            stacks: 1,
            magnitudes,
        }
    }

    pub fn handle(&self) -> ActiveEffectHandle {
        self.handle
    }

    pub fn spec(&self) -> &Arc<EffectSpec> {
        &self.spec
    }

    pub fn definition(&self) -> &EffectDefinition {
        self.spec.definition()
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Periodic effects execute through the Instant pathway and contribute
    /// nothing to aggregation.
    pub fn is_periodic(&self) -> bool {
        self.definition().is_periodic()
    }

    pub(crate) fn set_stacks(&mut self, stacks: u32) {
        self.stacks = stacks;
    }

    /// Replaces cached magnitudes; returns the attributes whose value moved.
    pub(crate) fn update_magnitudes(&mut self, magnitudes: Vec<f32>) -> Vec<Attribute> {
        let mut moved = Vec::new();
        for ((modifier, old), new) in self
            .spec
            .modifiers()
            .iter()
            .zip(&self.magnitudes)
            .zip(&magnitudes)
        {
            if !crate::attribute::nearly_equal(*old, *new) && !moved.contains(&modifier.attribute) {
                moved.push(modifier.attribute);
            }
        }
        self.magnitudes = magnitudes;
        moved
    }

    /// Attributes this instance contributes to through aggregation.
    pub fn aggregated_attributes(&self) -> Vec<Attribute> {
        if self.is_periodic() {
            Vec::new()
        } else {
            self.definition().modified_attributes()
        }
    }

    fn has_gated_modifiers(&self) -> bool {
        !self.is_periodic()
            && self
                .spec
                .modifiers()
                .iter()
                .any(|modifier| !modifier.requirements.is_empty())
    }
}

/// Active effects of one entity, iterated in application order.
#[derive(Clone, Debug, Default)]
pub struct ActiveEffects {
    effects: BTreeMap<ActiveEffectHandle, ActiveEffect>,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, effect: ActiveEffect) {
        self.effects.insert(effect.handle, effect);
    }

    pub(crate) fn remove(&mut self, handle: ActiveEffectHandle) -> Option<ActiveEffect> {
        self.effects.remove(&handle)
    }

    pub fn get(&self, handle: ActiveEffectHandle) -> Option<&ActiveEffect> {
        self.effects.get(&handle)
    }

    pub(crate) fn get_mut(&mut self, handle: ActiveEffectHandle) -> Option<&mut ActiveEffect> {
        self.effects.get_mut(&handle)
    }

    pub fn contains(&self, handle: ActiveEffectHandle) -> bool {
        self.effects.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.effects.values()
    }

    pub fn handles(&self) -> impl Iterator<Item = ActiveEffectHandle> + '_ {
        self.effects.keys().copied()
    }

    /// Existing stackable instance of `effect` from the same applier.
    ///
    /// The applier is the instigator. Without one, the causer's name stands
    /// in so unrelated sources never share stacks.
    pub fn find_stackable(&self, effect: &EffectId, context: &EffectContext) -> Option<ActiveEffectHandle> {
        self.effects
            .values()
            .find(|active| {
                let existing = active.spec.context();
                active.definition().stacking.is_some()
                    && &active.definition().id == effect
                    && existing.instigator == context.instigator
                    && (context.instigator.is_some() || existing.causer == context.causer)
            })
            .map(ActiveEffect::handle)
    }

    /// Handles of effects whose magnitudes read `attribute` live on `owner`.
    pub fn live_dependents(&self, attribute: Attribute, owner: EntityId) -> Vec<ActiveEffectHandle> {
        self.effects
            .values()
            .filter(|active| !active.is_periodic())
            .filter(|active| active.spec.live_attributes_on(owner).contains(&attribute))
            .map(ActiveEffect::handle)
            .collect()
    }

    /// Attributes with at least one tag-gated modifier.
    pub fn gated_attributes(&self) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        for active in self.effects.values().filter(|a| a.has_gated_modifiers()) {
            for modifier in active.spec.modifiers() {
                if !modifier.requirements.is_empty() && !attributes.contains(&modifier.attribute) {
                    attributes.push(modifier.attribute);
                }
            }
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_monotonic() {
        let mut handles = HandleAllocator::new();
        let first = handles.allocate();
        let second = handles.allocate();
        assert!(first < second);
        assert_eq!(first.to_string(), "h1");
    }

    #[test]
    fn stacks_to_remove_from_authored_integers() {
        assert_eq!(StacksToRemove::from(-1), StacksToRemove::All);
        assert_eq!(StacksToRemove::from(-7), StacksToRemove::All);
        assert_eq!(StacksToRemove::from(0), StacksToRemove::All);
        assert_eq!(StacksToRemove::from(2), StacksToRemove::Count(2));
        assert_eq!(i32::from(StacksToRemove::All), -1);
        assert_eq!(i32::from(StacksToRemove::Count(3)), 3);
    }

    #[test]
    fn resolve_never_exceeds_held_stacks() {
        assert_eq!(StacksToRemove::All.resolve(4), 4);
        assert_eq!(StacksToRemove::Count(2).resolve(4), 2);
        assert_eq!(StacksToRemove::Count(9).resolve(4), 4);
        assert_eq!(StacksToRemove::Count(0).resolve(4), 0);
    }
}
