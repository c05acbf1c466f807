//! Magnitude calculator loader.

use std::path::Path;
use std::sync::Arc;

use stats_core::{CalculatorRegistry, LinearCalculation};

use crate::loaders::{LoadResult, read_file};

/// Loader for linear calculators from RON files.
///
/// File format: a list of [`LinearCalculation`]s, each registered under its
/// `name`.
///
/// ```ron
/// [
///     (
///         name: "max_stamina",
///         capture: Some((attribute: Endurance, side: Target)),
///         base_magnitude: 80.0,
///         attribute_multiplier: 2.5,
///         level_multiplier: 10.0,
///     ),
/// ]
/// ```
pub struct CalculationLoader;

impl CalculationLoader {
    pub fn load(path: &Path) -> LoadResult<CalculatorRegistry> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<CalculatorRegistry> {
        let calculations: Vec<LinearCalculation> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse calculations RON: {}", e))?;

        let mut registry = CalculatorRegistry::new();
        for calculation in calculations {
            if calculation.name.is_empty() {
                anyhow::bail!("calculation without a name");
            }
            if registry.register(Arc::new(calculation)).is_some() {
                anyhow::bail!("duplicate calculation name in calculations RON");
            }
        }
        Ok(registry)
    }
}
