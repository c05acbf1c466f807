//! Magnitude calculation.
//!
//! A magnitude is computed from captured attributes plus inputs that are not
//! attributes at all (the source's character level). Captures are either
//! live, read from the target's store whenever the magnitude is evaluated, or
//! snapshotted into the [`EffectSpec`] when it is built and applied.
//!
//! Only captured attributes drive re-evaluation. A change in an external
//! input such as level is picked up the next time a captured attribute moves,
//! never on its own.

mod linear;

pub use linear::LinearCalculation;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attribute::Attribute;
use crate::effect::EffectSpec;
use crate::store::AttributeStore;
use crate::world::EntityId;

/// Which side of an application a capture reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaptureSide {
    /// The instigator of the effect.
    Source,
    /// The entity the effect is applied to.
    Target,
}

/// An attribute read by a magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeCapture {
    pub attribute: Attribute,
    pub side: CaptureSide,
    /// Read once at application instead of live.
    #[cfg_attr(feature = "serde", serde(default))]
    pub snapshot: bool,
}

impl AttributeCapture {
    pub const fn source(attribute: Attribute) -> Self {
        Self {
            attribute,
            side: CaptureSide::Source,
            snapshot: false,
        }
    }

    pub const fn target(attribute: Attribute) -> Self {
        Self {
            attribute,
            side: CaptureSide::Target,
            snapshot: false,
        }
    }

    pub const fn snapshotted(mut self) -> Self {
        self.snapshot = true;
        self
    }

    /// Returns true if this capture reads `target`'s store at evaluation time.
    ///
    /// Source-side captures are live only on self-applied effects; a foreign
    /// source's value is taken when the spec is built.
    pub fn is_live_on(&self, spec: &EffectSpec, target: EntityId) -> bool {
        if self.snapshot {
            return false;
        }
        match self.side {
            CaptureSide::Target => true,
            CaptureSide::Source => spec.context().instigator == Some(target),
        }
    }
}

/// External, non-attribute input reachable from an effect's source object.
pub trait LevelProvider: Send + Sync + fmt::Debug {
    fn actor_level(&self) -> i32;
}

/// Resolves capture values for one evaluation.
#[derive(Clone, Copy, Debug)]
pub struct CaptureReader<'a> {
    spec: &'a EffectSpec,
    target: Option<(EntityId, &'a AttributeStore)>,
}

impl<'a> CaptureReader<'a> {
    pub fn new(spec: &'a EffectSpec, target: Option<(EntityId, &'a AttributeStore)>) -> Self {
        Self { spec, target }
    }

    /// Reads one capture. Unset or unresolved captures read as `0`.
    pub fn read(&self, capture: &AttributeCapture) -> f32 {
        match self.target {
            Some((entity, store)) if capture.is_live_on(self.spec, entity) => {
                store.current(capture.attribute)
            }
            _ => self.spec.captured(capture).unwrap_or(0.0),
        }
    }

    pub fn spec(&self) -> &'a EffectSpec {
        self.spec
    }
}

/// Computes a modifier magnitude from a spec and its captures.
pub trait MagnitudeCalculator: Send + Sync + fmt::Debug {
    /// Registry key referenced by effect definitions.
    fn name(&self) -> &str;

    /// Attributes this calculator reads.
    fn captures(&self) -> &[AttributeCapture];

    fn calculate(&self, spec: &EffectSpec, captures: &CaptureReader<'_>) -> f32;
}

/// Named calculators available to effect definitions.
#[derive(Clone, Default)]
pub struct CalculatorRegistry {
    calculators: HashMap<String, Arc<dyn MagnitudeCalculator>>,
}

impl CalculatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a calculator under its own name, replacing any previous one.
    pub fn register(
        &mut self,
        calculator: Arc<dyn MagnitudeCalculator>,
    ) -> Option<Arc<dyn MagnitudeCalculator>> {
        let previous = self
            .calculators
            .insert(calculator.name().to_owned(), calculator);
        if let Some(previous) = &previous {
            tracing::warn!(name = previous.name(), "replaced magnitude calculator");
        }
        previous
    }

    pub fn with(mut self, calculator: impl MagnitudeCalculator + 'static) -> Self {
        self.register(Arc::new(calculator));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn MagnitudeCalculator>> {
        self.calculators.get(name)
    }

    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.calculators.keys().map(String::as_str)
    }
}

impl fmt::Debug for CalculatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("CalculatorRegistry")
            .field("calculators", &names)
            .finish()
    }
}
