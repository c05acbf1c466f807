//! Content factory for building engine inputs from data files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stats_core::{
    AttributeInitializer, CalculatorRegistry, EffectCatalog, EffectId, EffectSource, EngineConfig,
    StatWorld,
};

use crate::loaders::{
    CalculationLoader, ConfigLoader, EffectLoader, LoadResult, SourceConfig, SourceLoader,
};

/// Everything a [`StatWorld`] and its effect sources are built from.
#[derive(Debug)]
pub struct StatsContent {
    pub config: EngineConfig,
    pub calculators: CalculatorRegistry,
    pub effects: EffectCatalog,
    pub sources: Vec<SourceConfig>,
}

impl StatsContent {
    /// Effect ids of the default initializer, applied in this order.
    pub const INITIALIZER_EFFECTS: [&'static str; 3] =
        ["init_primary", "init_secondary", "init_vital"];

    /// Creates an empty world using this content's config and calculators.
    pub fn build_world(&self) -> StatWorld {
        StatWorld::new(self.config.clone(), self.calculators.clone())
    }

    /// Builds a fresh instance of the named source.
    pub fn source(&self, name: &str) -> Option<EffectSource> {
        self.sources
            .iter()
            .find(|source| source.name == name)
            .map(|source| source.build(&self.effects))
    }

    /// Initializer made of the [`INITIALIZER_EFFECTS`](Self::INITIALIZER_EFFECTS).
    pub fn initializer(&self) -> LoadResult<AttributeInitializer> {
        let [primary, secondary, vital] = Self::INITIALIZER_EFFECTS.map(|id| {
            self.effects
                .require(&EffectId::new(id))
                .map(Arc::clone)
        });
        Ok(AttributeInitializer::new(primary?, secondary?, vital?))
    }
}

/// Content factory that loads all stat content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// ├── calculations.ron
/// ├── effects.ron
/// └── sources.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load engine configuration from `config.toml`.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        ConfigLoader::load(&self.data_dir.join("config.toml"))
    }

    /// Load calculators from `calculations.ron`.
    pub fn load_calculations(&self) -> LoadResult<CalculatorRegistry> {
        CalculationLoader::load(&self.data_dir.join("calculations.ron"))
    }

    /// Load the effect catalog from `effects.ron`.
    pub fn load_effects(&self) -> LoadResult<EffectCatalog> {
        EffectLoader::load(&self.data_dir.join("effects.ron"))
    }

    /// Load effect source row sets from `sources.ron`.
    pub fn load_sources(&self) -> LoadResult<Vec<SourceConfig>> {
        SourceLoader::load(&self.data_dir.join("sources.ron"))
    }

    /// Load every file of the data directory.
    pub fn load_all(&self) -> LoadResult<StatsContent> {
        let content = StatsContent {
            config: self.load_config()?,
            calculators: self.load_calculations()?,
            effects: self.load_effects()?,
            sources: self.load_sources()?,
        };
        tracing::info!(
            data_dir = %self.data_dir.display(),
            calculators = content.calculators.len(),
            effects = content.effects.len(),
            sources = content.sources.len(),
            "loaded stat content"
        );
        Ok(content)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn missing_directory_reports_the_file() {
        let factory = ContentFactory::new("/nonexistent/stats-data");
        let err = factory.load_config().expect_err("no such directory");
        assert!(err.to_string().contains("config.toml"));
    }
}
