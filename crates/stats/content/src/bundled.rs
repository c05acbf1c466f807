//! Sample content compiled into the crate.

use crate::loaders::{
    CalculationLoader, ConfigLoader, EffectLoader, LoadResult, SourceLoader, StatsContent,
};

pub const CONFIG_TOML: &str = include_str!("../data/config.toml");
pub const CALCULATIONS_RON: &str = include_str!("../data/calculations.ron");
pub const EFFECTS_RON: &str = include_str!("../data/effects.ron");
pub const SOURCES_RON: &str = include_str!("../data/sources.ron");

/// Parses the bundled sample data.
pub fn load() -> LoadResult<StatsContent> {
    Ok(StatsContent {
        config: ConfigLoader::parse(CONFIG_TOML)?,
        calculators: CalculationLoader::parse(CALCULATIONS_RON)?,
        effects: EffectLoader::parse(EFFECTS_RON)?,
        sources: SourceLoader::parse(SOURCES_RON)?,
    })
}
