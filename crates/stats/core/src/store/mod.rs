//! Attribute store and clamp registry.
//!
//! The store holds one entity's base/current values and enforces the
//! `0 ≤ current ≤ max` bound at three checkpoints:
//!
//! ```text
//! Instant / Periodic:   pre_base_change → [base written] → pre_change → post_effect_execute
//! Duration / Infinite:  pre_change
//! ```
//!
//! Checkpoints only compute clamped values. Writing them, and deciding which
//! attributes to re-evaluate afterwards, is the caller's job (see
//! [`crate::ActorStats`]). `pre_change` never touches the modifier stack, so a
//! duration effect's raw contribution stays banked and reappears when the
//! maximum grows.

mod observer;
mod pairs;

pub use observer::{AttributeChange, ChangeCallback, ChangeObservers, SubscriptionToken};
pub use pairs::PairRegistry;

use crate::attribute::{Attribute, AttributeData, RoundingPolicy, nearly_equal};

/// Result of the `pre_change` checkpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClampedValue {
    /// Value to write.
    pub value: f32,
    /// The paired maximum, when it cut the proposed value down.
    pub bounded_by_max: Option<f32>,
}

/// A base value pulled back under a maximum that just changed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BaseCorrection {
    pub current: Attribute,
    pub max: Attribute,
    pub old_base: f32,
    pub new_base: f32,
}

/// Base and current values for every attribute of one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeStore {
    values: [AttributeData; Attribute::COUNT],
    rounding: [RoundingPolicy; Attribute::COUNT],
    pairs: PairRegistry,
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::new(RoundingPolicy::default())
    }
}

impl AttributeStore {
    /// Creates a store with every value at zero and `rounding` on every attribute.
    pub fn new(rounding: RoundingPolicy) -> Self {
        Self {
            values: [AttributeData::default(); Attribute::COUNT],
            rounding: [rounding; Attribute::COUNT],
            pairs: PairRegistry::new(),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    #[inline]
    pub fn current(&self, attribute: Attribute) -> f32 {
        self.values[attribute.index()].current
    }

    #[inline]
    pub fn base(&self, attribute: Attribute) -> f32 {
        self.values[attribute.index()].base
    }

    pub fn data(&self, attribute: Attribute) -> AttributeData {
        self.values[attribute.index()]
    }

    pub fn rounding_policy(&self, attribute: Attribute) -> RoundingPolicy {
        self.rounding[attribute.index()]
    }

    pub fn pairs(&self) -> &PairRegistry {
        &self.pairs
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn set_rounding_policy(&mut self, attribute: Attribute, policy: RoundingPolicy) {
        self.rounding[attribute.index()] = policy;
    }

    /// Records a current/max bound. Idempotent.
    pub fn register_pair(&mut self, current: Attribute, max: Attribute) -> bool {
        let changed = self.pairs.register(current, max);
        if changed {
            tracing::trace!(%current, %max, "registered attribute pair");
        }
        changed
    }

    /// Registers Health/MaxHealth, Mana/MaxMana and Stamina/MaxStamina.
    pub fn register_standard_pairs(&mut self) {
        for (current, max) in Attribute::STANDARD_PAIRS {
            self.register_pair(current, max);
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Sets base and current together, rounded but unclamped.
    ///
    /// Meant for building a stat block before any effect touches it.
    pub fn init(&mut self, attribute: Attribute, value: f32) {
        let value = self.rounding_policy(attribute).apply(value);
        self.values[attribute.index()] = AttributeData::new(value);
    }

    /// Raw base write after the checkpoints have run. Returns the old base.
    pub(crate) fn write_base(&mut self, attribute: Attribute, value: f32) -> f32 {
        core::mem::replace(&mut self.values[attribute.index()].base, value)
    }

    /// Raw current write after the checkpoints have run. Returns the old value.
    pub(crate) fn write_current(&mut self, attribute: Attribute, value: f32) -> f32 {
        core::mem::replace(&mut self.values[attribute.index()].current, value)
    }

    // ========================================================================
    // Checkpoints
    // ========================================================================

    /// Upper bound for `attribute`, if it is the current side of a pair.
    fn upper_bound(&self, attribute: Attribute) -> Option<f32> {
        self.pairs
            .max_of(attribute)
            .map(|max| self.current(max).max(0.0))
    }

    /// Clamp-and-round for a proposed current value.
    pub fn pre_change(&self, attribute: Attribute, proposed: f32) -> ClampedValue {
        let rounding = self.rounding_policy(attribute);
        let Some(upper) = self.upper_bound(attribute) else {
            return ClampedValue {
                value: rounding.apply(proposed),
                bounded_by_max: None,
            };
        };

        let bounded_by_max = (proposed > upper && !nearly_equal(proposed, upper)).then_some(upper);
        // Rounding can step past the bound when the max uses a looser policy.
        let value = rounding.apply(proposed.clamp(0.0, upper)).clamp(0.0, upper);
        ClampedValue {
            value,
            bounded_by_max,
        }
    }

    /// Clamp-and-round for a proposed base value (Instant/Periodic only).
    pub fn pre_base_change(&self, attribute: Attribute, proposed: f32) -> f32 {
        let rounding = self.rounding_policy(attribute);
        match self.upper_bound(attribute) {
            Some(upper) => rounding.apply(proposed.clamp(0.0, upper)).clamp(0.0, upper),
            None => rounding.apply(proposed),
        }
    }

    /// After an Instant/Periodic execution changed `max`, pulls its paired
    /// current's base back under the new bound.
    ///
    /// Returns the correction when the base actually moved. The caller must
    /// re-evaluate the paired current afterwards.
    pub fn post_effect_execute(&mut self, max: Attribute) -> Option<BaseCorrection> {
        let current = self.pairs.current_of(max)?;
        let old_base = self.base(current);
        let new_base = self.pre_base_change(current, old_base);
        if nearly_equal(old_base, new_base) {
            return None;
        }

        self.write_base(current, new_base);
        Some(BaseCorrection {
            current,
            max,
            old_base,
            new_base,
        })
    }
}
