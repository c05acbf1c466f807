//! Effect specifications: a definition instantiated at a level with a context.

use std::collections::HashMap;
use std::sync::Arc;

use crate::attribute::Attribute;
use crate::error::EffectError;
use crate::magnitude::{AttributeCapture, CalculatorRegistry, CaptureReader, LevelProvider, MagnitudeCalculator};
use crate::tags::TagRequirements;
use crate::world::EntityId;

use super::definition::{AttributeBasedFloat, EffectDefinition, Magnitude, ModifierOp, ScalableFloat};

/// Who applied an effect, to whom, and through what.
#[derive(Clone, Debug, Default)]
pub struct EffectContext {
    /// Source entity.
    pub instigator: Option<EntityId>,
    /// Filled in when the spec is applied.
    pub target: Option<EntityId>,
    /// Name of the object that caused the application (a trap, an area).
    pub causer: Option<String>,
    /// External interface for non-attribute inputs such as level.
    pub source_object: Option<Arc<dyn LevelProvider>>,
}

impl EffectContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instigator(mut self, instigator: EntityId) -> Self {
        self.instigator = Some(instigator);
        self
    }

    pub fn with_target(mut self, target: EntityId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_causer(mut self, causer: impl Into<String>) -> Self {
        self.causer = Some(causer.into());
        self
    }

    pub fn with_source_object(mut self, source_object: Arc<dyn LevelProvider>) -> Self {
        self.source_object = Some(source_object);
        self
    }

    /// Level reported by the source object, if there is one.
    pub fn source_level(&self) -> Option<i32> {
        self.source_object.as_ref().map(|source| source.actor_level())
    }
}

/// A magnitude with its calculator resolved.
#[derive(Clone, Debug)]
pub enum ResolvedMagnitude {
    Constant(f32),
    AttributeBased(AttributeBasedFloat),
    Scalable(ScalableFloat),
    Custom(Arc<dyn MagnitudeCalculator>),
}

impl ResolvedMagnitude {
    fn resolve(magnitude: &Magnitude, calculators: &CalculatorRegistry) -> Result<Self, EffectError> {
        Ok(match magnitude {
            Magnitude::Constant(value) => Self::Constant(*value),
            Magnitude::AttributeBased(float) => Self::AttributeBased(*float),
            Magnitude::Scalable(float) => Self::Scalable(*float),
            Magnitude::Custom(name) => Self::Custom(Arc::clone(
                calculators
                    .get(name)
                    .ok_or_else(|| EffectError::UnknownCalculator(name.clone()))?,
            )),
        })
    }

    pub fn captures(&self) -> &[AttributeCapture] {
        match self {
            Self::Constant(_) | Self::Scalable(_) => &[],
            Self::AttributeBased(float) => core::slice::from_ref(&float.capture),
            Self::Custom(calculator) => calculator.captures(),
        }
    }

    pub fn evaluate(&self, spec: &EffectSpec, reader: &CaptureReader<'_>) -> f32 {
        match self {
            Self::Constant(value) => *value,
            Self::AttributeBased(float) => float.evaluate(reader.read(&float.capture)),
            Self::Scalable(float) => float.at_level(spec.level()),
            Self::Custom(calculator) => calculator.calculate(spec, reader),
        }
    }
}

/// A modifier ready to execute or aggregate.
#[derive(Clone, Debug)]
pub struct SpecModifier {
    pub attribute: Attribute,
    pub op: ModifierOp,
    pub magnitude: ResolvedMagnitude,
    pub requirements: TagRequirements,
}

/// An effect definition instantiated at a level, with its context and
/// captured values.
#[derive(Clone, Debug)]
pub struct EffectSpec {
    definition: Arc<EffectDefinition>,
    level: f32,
    context: EffectContext,
    modifiers: Vec<SpecModifier>,
    captured: HashMap<AttributeCapture, f32>,
}

impl EffectSpec {
    /// Validates the definition and resolves named calculators.
    pub fn new(
        definition: Arc<EffectDefinition>,
        level: f32,
        context: EffectContext,
        calculators: &CalculatorRegistry,
    ) -> Result<Self, EffectError> {
        definition.validate()?;
        if !level.is_finite() {
            return Err(EffectError::invalid_spec(
                definition.id.as_str(),
                "level must be finite",
            ));
        }

        let modifiers = definition
            .modifiers
            .iter()
            .map(|modifier| {
                Ok(SpecModifier {
                    attribute: modifier.attribute,
                    op: modifier.op,
                    magnitude: ResolvedMagnitude::resolve(&modifier.magnitude, calculators)?,
                    requirements: modifier.requirements.clone(),
                })
            })
            .collect::<Result<Vec<_>, EffectError>>()?;

        Ok(Self {
            definition,
            level,
            context,
            modifiers,
            captured: HashMap::new(),
        })
    }

    pub fn definition(&self) -> &Arc<EffectDefinition> {
        &self.definition
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    /// Level fed to calculators: the source object's, or this spec's own
    /// level when there is no source object.
    pub fn input_level(&self) -> i32 {
        self.context
            .source_level()
            .unwrap_or_else(|| self.level.round() as i32)
    }

    pub fn context(&self) -> &EffectContext {
        &self.context
    }

    pub fn modifiers(&self) -> &[SpecModifier] {
        &self.modifiers
    }

    /// Every capture read by any modifier, deduplicated.
    pub fn captures(&self) -> Vec<AttributeCapture> {
        let mut captures = Vec::new();
        for capture in self.modifiers.iter().flat_map(|m| m.magnitude.captures()) {
            if !captures.contains(capture) {
                captures.push(*capture);
            }
        }
        captures
    }

    /// Value stored for a snapshot or foreign-source capture.
    pub fn captured(&self, capture: &AttributeCapture) -> Option<f32> {
        self.captured.get(capture).copied()
    }

    pub fn set_captured(&mut self, capture: AttributeCapture, value: f32) {
        self.captured.insert(capture, value);
    }

    pub(crate) fn set_target(&mut self, target: EntityId) {
        self.context.target = Some(target);
    }

    /// Attributes on `target` whose change must re-evaluate this spec's
    /// magnitudes.
    pub fn live_attributes_on(&self, target: EntityId) -> Vec<Attribute> {
        let mut attributes = Vec::new();
        for capture in self.captures() {
            if capture.is_live_on(self, target) && !attributes.contains(&capture.attribute) {
                attributes.push(capture.attribute);
            }
        }
        attributes
    }
}
