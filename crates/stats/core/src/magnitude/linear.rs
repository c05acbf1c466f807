//! Linear level-scaled calculator.
//!
//! ```text
//! result = base_magnitude + attribute_multiplier × captured + level_multiplier × level
//! ```
//!
//! `level` comes from the spec's source object ([`super::LevelProvider`]),
//! falling back to the level the spec was built at.

use super::{AttributeCapture, CaptureReader, MagnitudeCalculator};
use crate::attribute::RoundingPolicy;
use crate::effect::EffectSpec;

/// Data-configurable `base + a × attribute + b × level` calculator.
///
/// # Examples
///
/// ```
/// use stats_core::{Attribute, AttributeCapture, LinearCalculation};
///
/// // MaxStamina = 80 + 2.5 × Endurance + 10 × level
/// let max_stamina = LinearCalculation::new("max_stamina")
///     .with_capture(AttributeCapture::target(Attribute::Endurance))
///     .with_base(80.0)
///     .with_attribute_multiplier(2.5)
///     .with_level_multiplier(10.0);
///
/// assert_eq!(max_stamina.evaluate(9.0, 1), 112.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinearCalculation {
    pub name: String,
    pub capture: Option<AttributeCapture>,
    pub base_magnitude: f32,
    pub attribute_multiplier: f32,
    pub level_multiplier: f32,
    pub rounding: RoundingPolicy,
    /// Negative captures are clamped to zero unless this is set.
    pub allow_negative_capture: bool,
}

impl LinearCalculation {
    pub const DEFAULT_BASE_MAGNITUDE: f32 = 100.0;
    pub const DEFAULT_ATTRIBUTE_MULTIPLIER: f32 = 1.0;
    pub const DEFAULT_LEVEL_MULTIPLIER: f32 = 10.0;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_capture(mut self, capture: AttributeCapture) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn with_base(mut self, base: f32) -> Self {
        self.base_magnitude = base;
        self
    }

    pub fn with_attribute_multiplier(mut self, multiplier: f32) -> Self {
        self.attribute_multiplier = multiplier;
        self
    }

    pub fn with_level_multiplier(mut self, multiplier: f32) -> Self {
        self.level_multiplier = multiplier;
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn allowing_negative_capture(mut self) -> Self {
        self.allow_negative_capture = true;
        self
    }

    /// The formula itself, given an already-read capture and level.
    pub fn evaluate(&self, captured: f32, level: i32) -> f32 {
        let captured = if self.allow_negative_capture {
            captured
        } else {
            captured.max(0.0)
        };
        let raw = self.base_magnitude
            + self.attribute_multiplier * captured
            + self.level_multiplier * level as f32;
        self.rounding.apply(raw)
    }
}

impl Default for LinearCalculation {
    fn default() -> Self {
        Self {
            name: String::new(),
            capture: None,
            base_magnitude: Self::DEFAULT_BASE_MAGNITUDE,
            attribute_multiplier: Self::DEFAULT_ATTRIBUTE_MULTIPLIER,
            level_multiplier: Self::DEFAULT_LEVEL_MULTIPLIER,
            rounding: RoundingPolicy::RoundHalfToEven,
            allow_negative_capture: false,
        }
    }
}

impl MagnitudeCalculator for LinearCalculation {
    fn name(&self) -> &str {
        &self.name
    }

    fn captures(&self) -> &[AttributeCapture] {
        self.capture.as_slice()
    }

    fn calculate(&self, spec: &EffectSpec, captures: &CaptureReader<'_>) -> f32 {
        let captured = self
            .capture
            .as_ref()
            .map_or(0.0, |capture| captures.read(capture));
        let level = spec.input_level();
        let result = self.evaluate(captured, level);
        tracing::trace!(
            calculator = %self.name,
            captured,
            level,
            result,
            "linear magnitude"
        );
        result
    }
}
