//! Authored, immutable effect definitions.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attribute::Attribute;
use crate::error::EffectError;
use crate::magnitude::AttributeCapture;
use crate::tags::{GameplayTag, TagRequirements};

/// Stable identifier of an effect definition ("effect class").
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EffectId(String);

impl EffectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EffectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EffectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Duration class of an effect.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DurationPolicy {
    /// Executes once against base values.
    Instant,
    /// Active until the scheduler expires it after `seconds`.
    Duration { seconds: f32 },
    /// Active until removed.
    Infinite,
}

impl DurationPolicy {
    pub const fn is_instant(&self) -> bool {
        matches!(self, Self::Instant)
    }

    pub const fn is_infinite(&self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Seconds until expiry, for Duration effects.
    pub const fn seconds(&self) -> Option<f32> {
        match self {
            Self::Duration { seconds } => Some(*seconds),
            _ => None,
        }
    }
}

/// How a modifier combines with the running value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierOp {
    Add,
    Multiply,
    Override,
}

/// `(captured + pre_multiply_add) × coefficient + post_multiply_add`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeBasedFloat {
    pub capture: AttributeCapture,
    #[cfg_attr(feature = "serde", serde(default = "one"))]
    pub coefficient: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pre_multiply_add: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub post_multiply_add: f32,
}

#[cfg(feature = "serde")]
fn one() -> f32 {
    1.0
}

impl AttributeBasedFloat {
    pub const fn new(capture: AttributeCapture) -> Self {
        Self {
            capture,
            coefficient: 1.0,
            pre_multiply_add: 0.0,
            post_multiply_add: 0.0,
        }
    }

    pub const fn with_coefficient(mut self, coefficient: f32) -> Self {
        self.coefficient = coefficient;
        self
    }

    pub const fn with_pre_add(mut self, value: f32) -> Self {
        self.pre_multiply_add = value;
        self
    }

    pub const fn with_post_add(mut self, value: f32) -> Self {
        self.post_multiply_add = value;
        self
    }

    pub fn evaluate(&self, captured: f32) -> f32 {
        (captured + self.pre_multiply_add) * self.coefficient + self.post_multiply_add
    }
}

/// `base + per_level × (level - 1)`, read at the spec's level.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalableFloat {
    pub base: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub per_level: f32,
}

impl ScalableFloat {
    pub const fn new(base: f32, per_level: f32) -> Self {
        Self { base, per_level }
    }

    pub fn at_level(&self, level: f32) -> f32 {
        self.base + self.per_level * (level - 1.0)
    }
}

/// Where a modifier's magnitude comes from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Magnitude {
    Constant(f32),
    AttributeBased(AttributeBasedFloat),
    /// Scales with the level the effect is applied at.
    Scalable(ScalableFloat),
    /// Named calculator resolved through the calculator registry.
    Custom(String),
}

/// One authored attribute change.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModifierDef {
    pub attribute: Attribute,
    pub op: ModifierOp,
    pub magnitude: Magnitude,
    #[cfg_attr(feature = "serde", serde(default))]
    pub requirements: TagRequirements,
}

/// Re-application from the same source stacks onto the existing instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StackingPolicy {
    /// Maximum stack count; `None` is unbounded.
    #[cfg_attr(feature = "serde", serde(default))]
    pub limit: Option<u32>,
}

/// An authored effect.
///
/// # Examples
///
/// ```
/// use stats_core::{Attribute, EffectDefinition, ModifierOp};
///
/// let potion = EffectDefinition::duration("health_potion", 10.0)
///     .with_modifier(Attribute::Health, ModifierOp::Add, 100.0);
///
/// assert!(potion.validate().is_ok());
/// assert!(!potion.duration.is_instant());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectDefinition {
    pub id: EffectId,
    pub duration: DurationPolicy,
    #[cfg_attr(feature = "serde", serde(default))]
    pub period: Option<f32>,
    /// Periodic effects run one execution as soon as they are applied.
    #[cfg_attr(feature = "serde", serde(default = "enabled"))]
    pub execute_on_application: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub modifiers: Vec<ModifierDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stacking: Option<StackingPolicy>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub asset_tags: Vec<GameplayTag>,
    /// Owned by the target while this effect is active.
    #[cfg_attr(feature = "serde", serde(default))]
    pub granted_tags: Vec<GameplayTag>,
}

#[cfg(feature = "serde")]
fn enabled() -> bool {
    true
}

impl EffectDefinition {
    pub fn new(id: impl Into<EffectId>, duration: DurationPolicy) -> Self {
        Self {
            id: id.into(),
            duration,
            period: None,
            execute_on_application: true,
            modifiers: Vec::new(),
            stacking: None,
            asset_tags: Vec::new(),
            granted_tags: Vec::new(),
        }
    }

    pub fn instant(id: impl Into<EffectId>) -> Self {
        Self::new(id, DurationPolicy::Instant)
    }

    pub fn duration(id: impl Into<EffectId>, seconds: f32) -> Self {
        Self::new(id, DurationPolicy::Duration { seconds })
    }

    pub fn infinite(id: impl Into<EffectId>) -> Self {
        Self::new(id, DurationPolicy::Infinite)
    }

    /// Appends a constant-magnitude modifier.
    pub fn with_modifier(self, attribute: Attribute, op: ModifierOp, value: f32) -> Self {
        self.with_magnitude(attribute, op, Magnitude::Constant(value))
    }

    pub fn with_magnitude(mut self, attribute: Attribute, op: ModifierOp, magnitude: Magnitude) -> Self {
        self.modifiers.push(ModifierDef {
            attribute,
            op,
            magnitude,
            requirements: TagRequirements::default(),
        });
        self
    }

    /// Appends a modifier that only contributes while `requirements` hold.
    pub fn with_gated_modifier(
        mut self,
        attribute: Attribute,
        op: ModifierOp,
        magnitude: Magnitude,
        requirements: TagRequirements,
    ) -> Self {
        self.modifiers.push(ModifierDef {
            attribute,
            op,
            magnitude,
            requirements,
        });
        self
    }

    pub fn with_period(mut self, seconds: f32) -> Self {
        self.period = Some(seconds);
        self
    }

    pub fn without_execution_on_application(mut self) -> Self {
        self.execute_on_application = false;
        self
    }

    pub fn with_stacking(mut self, limit: Option<u32>) -> Self {
        self.stacking = Some(StackingPolicy { limit });
        self
    }

    pub fn with_asset_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.asset_tags.push(tag.into());
        self
    }

    pub fn with_granted_tag(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.granted_tags.push(tag.into());
        self
    }

    pub fn is_periodic(&self) -> bool {
        self.period.is_some()
    }

    /// Attributes touched by any modifier, in first-appearance order.
    pub fn modified_attributes(&self) -> Vec<Attribute> {
        let mut attributes = Vec::with_capacity(self.modifiers.len());
        for modifier in &self.modifiers {
            if !attributes.contains(&modifier.attribute) {
                attributes.push(modifier.attribute);
            }
        }
        attributes
    }

    /// Rejects malformed duration, period and magnitude data.
    pub fn validate(&self) -> Result<(), EffectError> {
        let invalid = |reason: &str| Err(EffectError::invalid_spec(self.id.as_str(), reason));

        if let DurationPolicy::Duration { seconds } = self.duration {
            if !(seconds.is_finite() && seconds > 0.0) {
                return invalid("duration must be a positive number of seconds");
            }
        }

        if let Some(period) = self.period {
            if self.duration.is_instant() {
                return invalid("instant effects cannot be periodic");
            }
            if !(period.is_finite() && period > 0.0) {
                return invalid("period must be positive");
            }
        }

        if matches!(self.stacking, Some(StackingPolicy { limit: Some(0) })) {
            return invalid("stack limit must be at least 1");
        }

        for (index, modifier) in self.modifiers.iter().enumerate() {
            let finite = match &modifier.magnitude {
                Magnitude::Constant(value) => value.is_finite(),
                Magnitude::AttributeBased(float) => {
                    float.coefficient.is_finite()
                        && float.pre_multiply_add.is_finite()
                        && float.post_multiply_add.is_finite()
                }
                Magnitude::Scalable(float) => float.base.is_finite() && float.per_level.is_finite(),
                Magnitude::Custom(name) => {
                    if name.is_empty() {
                        return invalid(&format!("modifier {index} names an empty calculator"));
                    }
                    true
                }
            };
            if !finite {
                return invalid(&format!("modifier {index} has a non-finite magnitude"));
            }
        }

        Ok(())
    }
}

/// Definitions by id, loaded at startup and shared read-only.
#[derive(Clone, Debug, Default)]
pub struct EffectCatalog {
    definitions: HashMap<EffectId, Arc<EffectDefinition>>,
}

impl EffectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and adds a definition, replacing one with the same id.
    pub fn insert(&mut self, definition: EffectDefinition) -> Result<Arc<EffectDefinition>, EffectError> {
        definition.validate()?;
        let definition = Arc::new(definition);
        if self
            .definitions
            .insert(definition.id.clone(), Arc::clone(&definition))
            .is_some()
        {
            tracing::warn!(effect = %definition.id, "replaced effect definition");
        }
        Ok(definition)
    }

    pub fn from_definitions(
        definitions: impl IntoIterator<Item = EffectDefinition>,
    ) -> Result<Self, EffectError> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    pub fn get(&self, id: &EffectId) -> Option<&Arc<EffectDefinition>> {
        self.definitions.get(id)
    }

    /// Like [`get`](Self::get), failing with `UnknownEffect`.
    pub fn require(&self, id: &EffectId) -> Result<&Arc<EffectDefinition>, EffectError> {
        self.get(id)
            .ok_or_else(|| EffectError::UnknownEffect(id.clone()))
    }

    pub fn contains(&self, id: &EffectId) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<EffectDefinition>> {
        self.definitions.values()
    }
}
